use care_app::app::{run, AppConfig};

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();
    let config = AppConfig::from_env().unwrap_or_default();
    match run(config) {
        Ok(rendered) => print!("{rendered}"),
        Err(err) => {
            eprintln!("Failed to build care agenda: {err:#}");
            std::process::exit(1);
        }
    }
}
