// CurrentMonitor
// Supplied without warranty.
// Use at your own risk.

use current_monitor::app::CurrentMonitorApp;
use iced::Size;

fn main() -> iced::Result {
    current_monitor::init_logging();

    iced::application(
        CurrentMonitorApp::title,
        CurrentMonitorApp::update,
        CurrentMonitorApp::view,
    )
    .subscription(CurrentMonitorApp::subscription)
    .window(iced::window::Settings {
        size: Size::new(900.0, 760.0),
        ..Default::default()
    })
    .antialiasing(true)
    .run()
}
