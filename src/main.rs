use gtk::prelude::*;
use gtk::Application;
use tracing_subscriber::EnvFilter;

mod ui;

fn main() -> gtk::glib::ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let app = Application::builder()
        .application_id("com.example.popularmovies")
        .build();

    app.connect_activate(ui::build_ui);

    app.run()
}
