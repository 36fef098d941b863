// CurrentMonitor
// Supplied without warranty.
// Use at your own risk.

//! Line plot of the ring buffer contents.
//!
//! The same routine draws into the GUI widget and into PNG files; it only sees a
//! snapshot, never the device.

use std::path::Path;

use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;

use crate::config::ChartSpec;

pub const TITLE: &str = "Real-time Current (mA)";
pub const X_LABEL: &str = "Sample";
pub const Y_LABEL: &str = "Current [mA]";

const PNG_SIZE: (u32, u32) = (800, 400);

/// `(index, value)` pairs in snapshot order.
pub fn points(values: &[f64]) -> impl Iterator<Item = (f64, f64)> + '_ {
    values.iter().enumerate().map(|(i, &v)| (i as f64, v))
}

/// Draws axes, labels and the current series on `builder`'s area.
pub fn draw<DB: DrawingBackend>(
    mut builder: ChartBuilder<'_, '_, DB>,
    values: &[f64],
    spec: &ChartSpec,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    let x_max = spec.capacity as f64;

    let mut chart = builder
        .caption(TITLE, ("sans-serif", 20))
        .margin(10)
        .set_label_area_size(LabelAreaPosition::Left, 50)
        .set_label_area_size(LabelAreaPosition::Bottom, 40)
        .build_cartesian_2d(0f64..x_max, spec.y_min..spec.y_max)?;

    chart
        .configure_mesh()
        .x_desc(X_LABEL)
        .y_desc("")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    if !values.is_empty() {
        chart.draw_series(LineSeries::new(points(values), BLUE.stroke_width(2)))?;
    }

    // Y label inside the plot area; plotters-iced gives no access to the margin.
    let label_pos = (x_max * 0.01, spec.y_max - (spec.y_max - spec.y_min) * 0.04);
    chart.draw_series(std::iter::once(Text::new(
        Y_LABEL,
        label_pos,
        ("sans-serif", 13).into_font(),
    )))?;

    Ok(())
}

/// Renders the snapshot to a PNG file.
pub fn save_png(path: &Path, values: &[f64], spec: &ChartSpec) -> Result<(), Box<dyn std::error::Error>> {
    let root = BitMapBackend::new(path, PNG_SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    draw(ChartBuilder::on(&root), values, spec)?;
    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use plotters_backend::{
        BackendColor, BackendCoord, BackendStyle, BackendTextStyle, DrawingErrorKind,
    };
    use std::cell::RefCell;
    use std::io;
    use std::rc::Rc;

    type Paths = Rc<RefCell<Vec<((u8, u8, u8), Vec<BackendCoord>)>>>;

    /// Backend that keeps every path and skips glyphs, so no fonts are needed.
    struct Recorder {
        paths: Paths,
    }

    impl DrawingBackend for Recorder {
        type ErrorType = io::Error;

        fn get_size(&self) -> (u32, u32) {
            (800, 400)
        }

        fn ensure_prepared(&mut self) -> Result<(), DrawingErrorKind<io::Error>> {
            Ok(())
        }

        fn present(&mut self) -> Result<(), DrawingErrorKind<io::Error>> {
            Ok(())
        }

        fn draw_pixel(
            &mut self,
            _point: BackendCoord,
            _color: BackendColor,
        ) -> Result<(), DrawingErrorKind<io::Error>> {
            Ok(())
        }

        fn draw_path<S: BackendStyle, I: IntoIterator<Item = BackendCoord>>(
            &mut self,
            path: I,
            style: &S,
        ) -> Result<(), DrawingErrorKind<io::Error>> {
            self.paths
                .borrow_mut()
                .push((style.color().rgb, path.into_iter().collect()));
            Ok(())
        }

        fn draw_text<TStyle: BackendTextStyle>(
            &mut self,
            _text: &str,
            _style: &TStyle,
            _pos: BackendCoord,
        ) -> Result<(), DrawingErrorKind<io::Error>> {
            Ok(())
        }

        fn estimate_text_size<TStyle: BackendTextStyle>(
            &self,
            text: &str,
            _style: &TStyle,
        ) -> Result<(u32, u32), DrawingErrorKind<io::Error>> {
            Ok((text.len() as u32 * 7, 12))
        }
    }

    /// Draws `values` and returns the pixel path of the data series.
    fn render(values: &[f64], spec: &ChartSpec) -> Option<Vec<BackendCoord>> {
        let paths = Paths::default();
        let root = Recorder {
            paths: paths.clone(),
        }
        .into_drawing_area();
        draw(ChartBuilder::on(&root), values, spec).unwrap();

        let series_color = (BLUE.0, BLUE.1, BLUE.2);
        let series: Vec<Vec<BackendCoord>> = paths
            .borrow()
            .iter()
            .filter(|(rgb, _)| *rgb == series_color)
            .map(|(_, pts)| pts.clone())
            .collect();
        assert!(series.len() <= 1);
        series.into_iter().next()
    }

    #[test]
    fn points_are_indexed_from_zero() {
        let pts: Vec<(f64, f64)> = points(&[5.0, 6.5, 7.0]).collect();
        assert_eq!(pts, vec![(0.0, 5.0), (1.0, 6.5), (2.0, 7.0)]);
        assert_eq!(points(&[]).count(), 0);
    }

    #[test]
    fn empty_snapshot_draws_axes_only() {
        assert_eq!(render(&[], &ChartSpec::default()), None);
    }

    #[test]
    fn full_buffer_draws_one_point_per_sample() {
        let spec = ChartSpec::default();
        let values: Vec<f64> = (0..spec.capacity).map(|i| i as f64).collect();
        let path = render(&values, &spec).unwrap();

        assert_eq!(path.len(), spec.capacity);
        assert!(path.windows(2).all(|w| w[0].0 < w[1].0));
        // Rising values go up the screen.
        assert!(path.windows(2).all(|w| w[0].1 >= w[1].1));
    }

    #[test]
    fn y_range_is_fixed() {
        let spec = ChartSpec::default();
        let small = render(&[50.0], &spec).unwrap();
        let mixed = render(&[50.0, 150.0], &spec).unwrap();

        // 50 mA lands on the same pixel whatever else is on the chart.
        assert_eq!(small[0], mixed[0]);
        assert!(mixed[1].1 < mixed[0].1);
    }

    #[test]
    fn x_axis_spans_capacity() {
        let narrow = render(&[1.0, 1.0], &ChartSpec::new(10, 0.0, 200.0).unwrap()).unwrap();
        let wide = render(&[1.0, 1.0], &ChartSpec::new(20, 0.0, 200.0).unwrap()).unwrap();

        assert_eq!(narrow[0].0, wide[0].0);
        let narrow_step = narrow[1].0 - narrow[0].0;
        let wide_step = wide[1].0 - wide[0].0;
        assert!(wide_step < narrow_step);
        assert!((narrow_step - 2 * wide_step).abs() <= 2);
    }

    #[test]
    fn out_of_range_values_render() {
        let spec = ChartSpec::default();
        let path = render(&[-50.0, 100.0, 1000.0], &spec).unwrap();
        assert!(!path.is_empty());
    }

    #[test]
    fn single_slot_chart() {
        let spec = ChartSpec::new(1, 0.0, 200.0).unwrap();
        let path = render(&[42.0], &spec).unwrap();
        assert_eq!(path.len(), 1);
    }

    #[test]
    fn png_written_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let spec = ChartSpec::default();
        let path = dir.path().join("chart.png");

        let values: Vec<f64> = (0..spec.capacity).map(|i| (i * 3) as f64).collect();
        save_png(&path, &values, &spec).unwrap();
        assert!(path.metadata().unwrap().len() > 0);
    }
}
