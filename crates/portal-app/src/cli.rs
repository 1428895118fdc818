//! `portal` command line

use crate::config::PortalConfig;
use crate::simulate::{self, SimulationOptions};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use portal_access::{dashboard_menu, evaluate_access, menu_view, FeatureRequirement, PlanValue, Tier};
use std::path::PathBuf;

/// Build the command tree
#[must_use]
pub fn command() -> Command {
    Command::new("portal")
        .version(crate::VERSION)
        .about("Plan-tier access checks for the funding portal")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Path to a TOML config file"),
        )
        .subcommand(
            Command::new("decide")
                .about("Evaluate a stored plan against a required tier")
                .arg(plan_arg())
                .arg(required_arg())
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
        .subcommand(
            Command::new("menu")
                .about("Show the dashboard menu with lock state")
                .arg(plan_arg())
                .arg(
                    Arg::new("admin")
                        .long("admin")
                        .action(ArgAction::SetTrue)
                        .help("Include administrator entries"),
                ),
        )
        .subcommand(
            Command::new("simulate")
                .about("Drive one gate through an upgrade against in-memory backends")
                .arg(plan_arg())
                .arg(required_arg())
                .arg(
                    Arg::new("upgrade-to")
                        .long("upgrade-to")
                        .required(true)
                        .value_parser(value_parser!(u32))
                        .help("Tier to purchase when blocked"),
                )
                .arg(
                    Arg::new("feature")
                        .long("feature")
                        .default_value("Protected Feature")
                        .help("Feature name shown on the gate"),
                )
                .arg(
                    Arg::new("fail-write")
                        .long("fail-write")
                        .action(ArgAction::SetTrue)
                        .help("Make the plan write fail"),
                ),
        )
}

fn plan_arg() -> Arg {
    Arg::new("plan")
        .long("plan")
        .default_value("none")
        .allow_hyphen_values(true)
        .help("Plan value as stored on the account")
}

fn required_arg() -> Arg {
    Arg::new("required")
        .long("required")
        .required(true)
        .value_parser(value_parser!(u32))
        .help("Tier the feature needs")
}

fn plan_of(args: &ArgMatches) -> PlanValue {
    args.get_one::<String>("plan")
        .map_or_else(PlanValue::none, |raw| PlanValue::from(raw.as_str()))
}

fn tier_of(args: &ArgMatches, id: &str) -> Tier {
    Tier::new(args.get_one::<u32>(id).copied().unwrap_or_default())
}

/// Config selected by `--config`, defaults without one
///
/// # Errors
/// Read or parse failures of the given file.
pub fn load_config(matches: &ArgMatches) -> crate::Result<PortalConfig> {
    match matches.get_one::<PathBuf>("config") {
        Some(path) => PortalConfig::load(path),
        None => Ok(PortalConfig::default()),
    }
}

/// Run the selected subcommand, returning the lines to print
///
/// # Errors
/// Serialization or simulation failures.
pub async fn execute(config: PortalConfig, matches: &ArgMatches) -> anyhow::Result<Vec<String>> {
    let catalog = config.catalog();
    let lines = match matches.subcommand() {
        Some(("decide", args)) => {
            let required = tier_of(args, "required");
            let decision = evaluate_access(&plan_of(args), required);
            if args.get_flag("json") {
                vec![serde_json::to_string_pretty(&decision)?]
            } else {
                vec![format!(
                    "{}: on {} ({}), needs {} ({})",
                    if decision.has_access { "granted" } else { "locked" },
                    catalog.name_of(decision.current_tier),
                    decision.current_tier,
                    catalog.name_of(decision.required_tier),
                    decision.required_tier,
                )]
            }
        }
        Some(("menu", args)) => {
            let entries = menu_view(&dashboard_menu(), &plan_of(args), args.get_flag("admin"), &catalog);
            entries
                .iter()
                .map(|e| match &e.badge {
                    Some(badge) => format!("{:<30} {:<28} locked ({badge})", e.title, e.href),
                    None => format!("{:<30} {}", e.title, e.href),
                })
                .collect()
        }
        Some(("simulate", args)) => {
            let feature = args
                .get_one::<String>("feature")
                .map_or("Protected Feature", String::as_str);
            let options = SimulationOptions {
                plan: plan_of(args),
                requirement: FeatureRequirement::new(feature, tier_of(args, "required")),
                upgrade_to: tier_of(args, "upgrade-to"),
                fail_write: args.get_flag("fail-write"),
            };
            let report = simulate::run(config, options).await?;
            let mut lines: Vec<String> = report.steps.iter().map(ToString::to_string).collect();
            lines.push(format!("stored    plan {}", report.stored_plan.to_stored()));
            lines
        }
        _ => anyhow::bail!("no subcommand given"),
    };
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(args: &[&str]) -> Vec<String> {
        let matches = command().try_get_matches_from(args).unwrap();
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(execute(PortalConfig::default(), &matches)).unwrap()
    }

    #[test]
    fn command_tree_is_valid() {
        command().debug_assert();
    }

    #[test]
    fn decide_reports_lock() {
        let lines = run(&["portal", "decide", "--plan", "none", "--required", "1"]);
        assert_eq!(lines, vec!["locked: on Free (0), needs Standard (1)".to_string()]);
    }

    #[test]
    fn decide_accepts_negative_plans() {
        let lines = run(&["portal", "decide", "--plan", "-3", "--required", "0"]);
        assert!(lines[0].starts_with("granted"));
    }

    #[test]
    fn decide_json_is_parseable() {
        let lines = run(&["portal", "decide", "--plan", "2", "--required", "1", "--json"]);
        let value: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(value["has_access"], serde_json::json!(true));
        assert_eq!(value["current_tier"], serde_json::json!(2));
    }

    #[test]
    fn menu_hides_admin_entries_by_default() {
        let lines = run(&["portal", "menu", "--plan", "1"]);
        assert_eq!(lines.len(), 6);
        let with_admin = run(&["portal", "menu", "--plan", "1", "--admin"]);
        assert_eq!(with_admin.len(), 9);
        assert!(with_admin.iter().any(|l| l.contains("/dashboard/admin/businesses")));
        assert!(lines.iter().any(|l| l.contains("locked (Premium)")));
    }

    #[test]
    fn missing_required_is_a_usage_error() {
        assert!(command().try_get_matches_from(["portal", "decide"]).is_err());
    }
}
