/// Native driver for feedview: enhances a saved article page from the command line
#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use clap::Parser;
    use feedview::config::AppConfig;
    use feedview::keybindings::KeyBindings;
    use feedview::native::{self, Options};
    use std::path::PathBuf;

    /// Apply inline image viewers, table and code tweaks to a saved page
    #[derive(Parser, Debug)]
    #[command(name = "feedview-native", version)]
    struct Args {
        /// HTML fragment of the page to process
        input: PathBuf,

        /// Write the processed markup here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Rendered width of the reading column in CSS pixels
        #[arg(short, long)]
        column_width: Option<f32>,

        /// Device pixel ratio of the simulated display
        #[arg(short = 'r', long, default_value_t = 1.0)]
        pixel_ratio: f32,

        /// Directory relative image sources are resolved against
        #[arg(long)]
        base_dir: Option<PathBuf>,

        /// Natural width for an image that cannot be measured, as SRC=WIDTH
        #[arg(long = "assume-width", value_parser = parse_override)]
        assumed_widths: Vec<(String, u32)>,

        /// Simulated taps on every viewer image
        #[arg(long, default_value_t = 0)]
        taps: usize,

        /// Configuration file (defaults to the user config directory)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print the shortcut table and exit
        #[arg(long)]
        list_shortcuts: bool,
    }

    fn parse_override(value: &str) -> Result<(String, u32), String> {
        native::parse_override(value).map_err(|e| e.to_string())
    }

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => match AppConfig::load_from_path(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Could not load {}: {}", path.display(), e);
                std::process::exit(2);
            }
        },
        None => AppConfig::load_from_default_path().unwrap_or_default(),
    };

    env_logger::Builder::new()
        .filter_level(config.preferences.log_level.to_level_filter())
        .parse_default_env()
        .init();

    if args.list_shortcuts {
        let bindings: KeyBindings = config.keybindings.to_keybindings();
        for (keys, description) in bindings.help_entries() {
            println!("{keys:<8} {description}");
        }
        return;
    }

    let options = Options {
        input: args.input,
        base_dir: args.base_dir,
        column_width: args.column_width.or(config.media.column_width),
        device_pixel_ratio: args.pixel_ratio,
        assumed_widths: args.assumed_widths,
        taps: args.taps,
    };

    let outcome = match native::run(&options, &config) {
        Ok(outcome) => outcome,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    log::info!(
        "{} images, {} viewers, {} pending; signals: {}",
        outcome.report.images.found,
        outcome.report.images.viewers,
        outcome.report.images.pending,
        outcome.signals.join(", ")
    );

    match &args.output {
        Some(path) => {
            if let Err(e) = std::fs::write(path, &outcome.html) {
                eprintln!("Could not write {}: {}", path.display(), e);
                std::process::exit(1);
            }
        }
        None => println!("{}", outcome.html),
    }
}

// WASM doesn't use main(), it uses wasm_bindgen's start function
#[cfg(target_arch = "wasm32")]
fn main() {}
