use dirauth::settings::*;

fn main() -> anyhow::Result<()> {
    // Load settings from the default location
    let project_settings = parse_settings(None)?;
    println!("Loaded settings: {:?}", project_settings);

    // An explicit path that does not exist is an error
    let is_err = parse_settings(Some("settings/missing.toml")).is_err();
    println!("Error on missing path: {:?}", is_err);

    // $ DIRAUTH_DIRECTORY__HOST=ldap.local cargo run --bin settings_demo -- --settings=settings/dev.toml
    let cli = Cli::parse();
    let project_settings = parse_settings(cli.settings.as_deref())?;
    println!("Directory host: {}", project_settings.directory.host);
    println!("Loaded settings: {:?}", project_settings);

    Ok(())
}
