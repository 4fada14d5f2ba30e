use mapbin::cli::CliOverrides;
use mapbin::config::ImportConfig;
use mapbin::container::EntityKind;
use mapbin::run_import;
use std::path::PathBuf;

const DEFAULT_CONFIG: &str = "mapbin.json";

fn main() {
    env_logger::init();
    let cli = match CliOverrides::parse_from_env() {
        Ok(parsed) => parsed,
        Err(err) => {
            eprintln!("[cli] {err}");
            std::process::exit(2);
        }
    };
    let config_path =
        cli.config_path().cloned().unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
    let mut config = ImportConfig::load_or_default(config_path);
    config.apply_overrides(&cli.into_import_overrides());

    let import = match run_import(&config) {
        Ok(import) => import,
        Err(err) => {
            eprintln!("Import error: {err:?}");
            std::process::exit(1);
        }
    };

    let mut meshes = 0usize;
    let mut lights = 0usize;
    let mut located = 0usize;
    for entity in &import.entities {
        match &entity.kind {
            EntityKind::Mesh { path } => {
                meshes += 1;
                if import.find_mesh(path).is_some() {
                    located += 1;
                }
            }
            EntityKind::Light { .. } => lights += 1,
            _ => {}
        }
    }
    println!(
        "{} groups, {} entities ({} mesh, {} light), {} skipped, {} deduplicated",
        import.groups.len(),
        import.entities.len(),
        meshes,
        lights,
        import.skipped_records,
        import.deduplicated
    );
    println!("{located}/{meshes} mesh references located in the asset index");
}
