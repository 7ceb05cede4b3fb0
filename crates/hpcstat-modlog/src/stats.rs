//! Statistics over parsed module loads.

use crate::parse::ModuleLoad;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::{BTreeMap, HashMap, HashSet};

/// How often a module was loaded and by whom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageCount {
    pub module: String,
    pub total: usize,
    /// (user, loads), ordered by user
    pub per_user: Vec<(String, usize)>,
    pub most_recent: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneralStats {
    pub unique_modules: usize,
    pub unique_users: usize,
    /// (module, loads), most loaded first
    pub top: Vec<(String, usize)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserActivity<'a> {
    pub user: String,
    pub distinct_modules: usize,
    /// Most recent first
    pub loads: Vec<&'a ModuleLoad>,
}

/// All load records from one log, in file order.
#[derive(Debug, Clone, Default)]
pub struct ModuleLog {
    records: Vec<ModuleLoad>,
}

impl ModuleLog {
    pub fn new(records: Vec<ModuleLoad>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Every record, in file order.
    pub fn full(&self) -> &[ModuleLoad] {
        &self.records
    }

    /// Loads of `module`. With `prefix_all`, every version of the module
    /// family counts (`python/3.9` selects all `python/...`).
    pub fn count_usage(&self, module: &str, prefix_all: bool) -> UsageCount {
        let family = module.split('/').next().unwrap_or(module);
        let selected: Vec<&ModuleLoad> = self
            .records
            .iter()
            .filter(|r| {
                if prefix_all {
                    r.module.split('/').next() == Some(family)
                } else {
                    r.module == module
                }
            })
            .collect();

        let mut per_user: BTreeMap<&str, usize> = BTreeMap::new();
        for record in &selected {
            *per_user.entry(record.user.as_str()).or_default() += 1;
        }

        UsageCount {
            module: module.to_string(),
            total: selected.len(),
            per_user: per_user
                .into_iter()
                .map(|(user, n)| (user.to_string(), n))
                .collect(),
            most_recent: selected.iter().map(|r| r.timestamp).max(),
        }
    }

    /// Unique module and user counts plus the `top` most loaded modules.
    pub fn general(&self, top: usize) -> GeneralStats {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        let mut users: HashSet<&str> = HashSet::new();
        for record in &self.records {
            *counts.entry(record.module.as_str()).or_default() += 1;
            users.insert(record.user.as_str());
        }

        let unique_modules = counts.len();
        let mut ranked: Vec<(String, usize)> = counts
            .into_iter()
            .map(|(module, n)| (module.to_string(), n))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(top);

        GeneralStats {
            unique_modules,
            unique_users: users.len(),
            top: ranked,
        }
    }

    /// The `n` most recent loads, newest first.
    pub fn recent(&self, n: usize) -> Vec<&ModuleLoad> {
        let mut sorted = newest_first(self.records.iter());
        sorted.truncate(n);
        sorted
    }

    pub fn by_user(&self, user: &str) -> UserActivity<'_> {
        let loads = newest_first(self.records.iter().filter(|r| r.user == user));
        let distinct_modules = loads
            .iter()
            .map(|r| r.module.as_str())
            .collect::<HashSet<_>>()
            .len();
        UserActivity {
            user: user.to_string(),
            distinct_modules,
            loads,
        }
    }

    /// Loads on dates from `start` to `end`, both included, in file order.
    pub fn by_date(&self, start: NaiveDate, end: NaiveDate) -> Vec<&ModuleLoad> {
        self.records
            .iter()
            .filter(|r| in_range(r, start, end))
            .collect()
    }

    pub fn by_date_and_user(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        user: &str,
    ) -> Vec<&ModuleLoad> {
        self.records
            .iter()
            .filter(|r| r.user == user && in_range(r, start, end))
            .collect()
    }
}

fn in_range(record: &ModuleLoad, start: NaiveDate, end: NaiveDate) -> bool {
    let date = record.timestamp.date();
    date >= start && date <= end
}

fn newest_first<'a>(records: impl Iterator<Item = &'a ModuleLoad>) -> Vec<&'a ModuleLoad> {
    let mut sorted: Vec<&ModuleLoad> = records.collect();
    sorted.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    sorted
}
