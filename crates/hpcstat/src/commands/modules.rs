//! `hpcstat modules`.

use super::emit;
use chrono::{Local, NaiveDate};
use hpcstat_cli::ModulesArgs;
use hpcstat_modlog::{GeneralStats, ModuleLoad, ModuleLog, UsageCount, read_log};
use hpcstat_output::{Align, Table};
use miette::{IntoDiagnostic, Result};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn run(args: &ModulesArgs) -> Result<()> {
    let today = Local::now().date_naive();
    let range = args.date_range(today).into_diagnostic()?;

    let (records, errors) = read_log(&args.log, today).into_diagnostic()?;
    if !errors.is_empty() {
        tracing::warn!("{} load lines in {} could not be parsed", errors.len(), args.log);
    }
    let log = ModuleLog::new(records);

    for (report, title, table) in reports(&log, args, range) {
        println!("{title}");
        emit(report, &table, args.output_dir.as_deref())?;
    }
    Ok(())
}

/// Tables requested by `args`, as (report name, title, table).
///
/// With no selection at all the general statistics are shown.
fn reports(
    log: &ModuleLog,
    args: &ModulesArgs,
    range: Option<(NaiveDate, NaiveDate)>,
) -> Vec<(&'static str, String, Table)> {
    let mut out = Vec::new();

    if let Some(module) = &args.module {
        let usage = log.count_usage(module, args.prefix_all);
        out.push(("module_usage", usage_title(&usage, args.prefix_all), usage_table(&usage)));
    }

    let nothing_selected =
        args.module.is_none() && !args.full && args.user.is_none() && range.is_none();
    if args.general || nothing_selected {
        let stats = log.general(args.top);
        out.push(("module_general", general_title(&stats), general_table(&stats)));
        out.push((
            "module_recent",
            format!("{} most recently loaded modules", args.recent),
            loads_table(log.recent(args.recent)),
        ));
    }

    if args.full {
        out.push((
            "module_full",
            format!("All {} module loads", log.len()),
            loads_table(log.full().iter()),
        ));
    }

    match (&args.user, range) {
        (Some(user), None) => {
            let activity = log.by_user(user);
            out.push((
                "module_user",
                format!(
                    "{} loaded {} distinct modules in {} loads",
                    user,
                    activity.distinct_modules,
                    activity.loads.len()
                ),
                loads_table(activity.loads),
            ));
        }
        (None, Some((start, end))) => {
            out.push((
                "module_dates",
                format!("Modules loaded between {start} and {end}"),
                loads_table(log.by_date(start, end)),
            ));
        }
        (Some(user), Some((start, end))) => {
            out.push((
                "module_dates",
                format!("Modules loaded between {start} and {end} by {user}"),
                loads_table(log.by_date_and_user(start, end, user)),
            ));
        }
        (None, None) => {}
    }

    out
}

fn usage_title(usage: &UsageCount, prefix_all: bool) -> String {
    let name = if prefix_all {
        let family = usage.module.split('/').next().unwrap_or(&usage.module);
        format!("{family}/*")
    } else {
        usage.module.clone()
    };
    match usage.most_recent {
        Some(ts) => format!(
            "{} was loaded {} times by {} users, most recently at {}",
            name,
            usage.total,
            usage.per_user.len(),
            ts.format(TIMESTAMP_FORMAT)
        ),
        None => format!("{name} was never loaded"),
    }
}

fn usage_table(usage: &UsageCount) -> Table {
    let mut table = Table::new(["User", "Loads"]).with_align(&[Align::Left, Align::Right]);
    for (user, loads) in &usage.per_user {
        table.push_row([user.clone(), loads.to_string()]);
    }
    table
}

fn general_title(stats: &GeneralStats) -> String {
    format!(
        "{} distinct modules loaded by {} users; top {}",
        stats.unique_modules,
        stats.unique_users,
        stats.top.len()
    )
}

fn general_table(stats: &GeneralStats) -> Table {
    let mut table = Table::new(["Module", "Loads"]).with_align(&[Align::Left, Align::Right]);
    for (module, loads) in &stats.top {
        table.push_row([module.clone(), loads.to_string()]);
    }
    table
}

fn loads_table<'a>(loads: impl IntoIterator<Item = &'a ModuleLoad>) -> Table {
    let mut table = Table::new(["Time", "Host", "User", "Module"]);
    for load in loads {
        table.push_row([
            load.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            load.host.clone(),
            load.user.clone(),
            load.module.clone(),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use chrono::NaiveDateTime;

    fn load(ts: &str, user: &str, module: &str) -> ModuleLoad {
        ModuleLoad {
            timestamp: NaiveDateTime::parse_from_str(ts, TIMESTAMP_FORMAT).unwrap(),
            host: "dn001".into(),
            user: user.into(),
            module: module.into(),
        }
    }

    fn log() -> ModuleLog {
        ModuleLog::new(vec![
            load("2024-01-02 09:00:00", "jdoe", "python/3.9"),
            load("2024-01-03 09:00:00", "asmith", "python/3.11"),
            load("2024-01-05 08:00:00", "jdoe", "gcc/12"),
        ])
    }

    fn args() -> ModulesArgs {
        ModulesArgs {
            log: Utf8PathBuf::from("modules.log"),
            module: None,
            prefix_all: false,
            general: false,
            top: 10,
            recent: 10,
            full: false,
            user: None,
            start: None,
            end: None,
            output_dir: None,
        }
    }

    fn names(reports: &[(&'static str, String, Table)]) -> Vec<&'static str> {
        reports.iter().map(|r| r.0).collect()
    }

    #[test]
    fn test_general_by_default() {
        let out = reports(&log(), &args(), None);
        assert_eq!(names(&out), vec!["module_general", "module_recent"]);
        assert_eq!(out[0].1, "3 distinct modules loaded by 2 users; top 3");
        assert_eq!(out[1].2.rows()[0][3], "gcc/12");
    }

    #[test]
    fn test_module_prefix_all() {
        let args = ModulesArgs {
            module: Some("python/3.9".into()),
            prefix_all: true,
            ..args()
        };
        let out = reports(&log(), &args, None);
        assert_eq!(names(&out), vec!["module_usage"]);
        assert_eq!(
            out[0].1,
            "python/* was loaded 2 times by 2 users, most recently at 2024-01-03 09:00:00"
        );
        assert_eq!(out[0].2.rows().len(), 2);
    }

    #[test]
    fn test_user_and_dates() {
        let day = |s: &str| s.parse::<NaiveDate>().unwrap();
        let args = ModulesArgs {
            user: Some("jdoe".into()),
            ..args()
        };

        let by_user = reports(&log(), &args, None);
        assert_eq!(names(&by_user), vec!["module_user"]);
        assert_eq!(by_user[0].1, "jdoe loaded 2 distinct modules in 2 loads");

        let range = Some((day("2024-01-03"), day("2024-01-05")));
        let by_dates = reports(&log(), &args, range);
        assert_eq!(names(&by_dates), vec!["module_dates"]);
        assert_eq!(by_dates[0].2.rows().len(), 1);
        assert_eq!(by_dates[0].2.rows()[0][3], "gcc/12");
    }
}
