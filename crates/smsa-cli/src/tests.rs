use super::*;

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["smsa"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn parses_run_command() {
    let cli = Cli::try_parse_from(["smsa", "run"]).expect("expected valid cli args");
    assert!(matches!(cli.command, Some(Commands::Run)));
}

#[test]
fn once_defaults_to_writing() {
    let cli = Cli::try_parse_from(["smsa", "once"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Once { dry_run: false })
    ));

    let cli = Cli::try_parse_from(["smsa", "once", "--dry-run"]).unwrap();
    assert!(matches!(cli.command, Some(Commands::Once { dry_run: true })));
}

#[test]
fn summary_parses_platform_case_insensitively() {
    let cli = Cli::try_parse_from(["smsa", "summary", "--platform", "YouTube", "--hours", "6"])
        .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Summary {
            platform: Some(Platform::Youtube),
            hours: 6
        })
    ));
}

#[test]
fn summary_defaults_to_one_day_all_platforms() {
    let cli = Cli::try_parse_from(["smsa", "summary"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Summary {
            platform: None,
            hours: 24
        })
    ));
}

#[test]
fn top_requires_a_valid_label() {
    let cli = Cli::try_parse_from(["smsa", "top", "--label", "negative"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Top {
            label: SentimentLabel::Negative,
            platform: None,
            limit: 10
        })
    ));

    assert!(Cli::try_parse_from(["smsa", "top"]).is_err());
    assert!(Cli::try_parse_from(["smsa", "top", "--label", "angry"]).is_err());
}

#[test]
fn unknown_platform_is_rejected() {
    assert!(Cli::try_parse_from(["smsa", "recent", "--platform", "myspace"]).is_err());
}

#[test]
fn cleanup_days_is_optional() {
    let cli = Cli::try_parse_from(["smsa", "cleanup"]).unwrap();
    assert!(matches!(cli.command, Some(Commands::Cleanup { days: None })));

    let cli = Cli::try_parse_from(["smsa", "cleanup", "--days", "7"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Cleanup { days: Some(7) })
    ));
}

#[test]
fn parses_db_subcommands() {
    let cli = Cli::try_parse_from(["smsa", "db", "migrate"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Migrate
        })
    ));
}

#[test]
fn trend_defaults_to_one_week() {
    let cli = Cli::try_parse_from(["smsa", "trend", "--platform", "reddit"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Trend {
            platform: Some(Platform::Reddit),
            hours: 168
        })
    ));
}
