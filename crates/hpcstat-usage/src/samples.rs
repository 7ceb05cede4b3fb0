//! Per-process resource samples and their reduction to per-node sums.

use hpcstat_hosts::Host;
use hpcstat_parsers::kib_to_gb;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// One process line from a listing on `host`.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceSample {
    pub host: Host,
    pub user: String,
    /// 100.0 is one fully used core
    pub cpu_percent: f64,
    pub rss_kib: f64,
}

/// How a user name from a process listing is compared to a job's owner.
///
/// `ps` cuts long names down to the column width and marks the cut with `+`
/// (`abcdefgh` becomes `abcdefg+`). `Prefix(n)` compares only the first `n`
/// characters, which is lossy: two users sharing those characters cannot be
/// told apart. [`ambiguous_users`] reports such collisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserMatch {
    Exact,
    Prefix(usize),
}

impl Default for UserMatch {
    fn default() -> Self {
        UserMatch::Prefix(7)
    }
}

impl UserMatch {
    pub fn matches(&self, listed: &str, wanted: &str) -> bool {
        match self {
            UserMatch::Exact => listed == wanted,
            UserMatch::Prefix(n) => {
                let listed = listed.strip_suffix('+').unwrap_or(listed);
                truncate(listed, *n) == truncate(wanted, *n)
            }
        }
    }

    /// Key under which users collide for this policy.
    pub fn key<'a>(&self, user: &'a str) -> &'a str {
        match self {
            UserMatch::Exact => user,
            UserMatch::Prefix(n) => truncate(user, *n),
        }
    }

    /// Column width to request from `ps -o user:<width>`.
    pub fn ps_width(&self) -> usize {
        match self {
            UserMatch::Exact => 64,
            UserMatch::Prefix(n) => n + 1,
        }
    }
}

impl fmt::Display for UserMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserMatch::Exact => f.write_str("exact"),
            UserMatch::Prefix(n) => write!(f, "prefix:{n}"),
        }
    }
}

impl FromStr for UserMatch {
    type Err = String;

    /// Accepts `exact`, `prefix:<n>` or a bare `<n>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("exact") {
            return Ok(UserMatch::Exact);
        }
        let n = s.strip_prefix("prefix:").unwrap_or(s);
        match n.parse::<usize>() {
            Ok(0) | Err(_) => Err(format!(
                "invalid user match '{s}': expected 'exact', 'prefix:<n>' or '<n>'"
            )),
            Ok(n) => Ok(UserMatch::Prefix(n)),
        }
    }
}

fn truncate(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}

/// CPU and memory totals for one user on one host.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ResourceSums {
    pub cpu_percent_sum: f64,
    pub memory_gb: f64,
    /// Number of samples that contributed
    pub matched: usize,
}

impl ResourceSums {
    pub fn cores(&self) -> f64 {
        self.cpu_percent_sum / 100.0
    }
}

/// Sum the samples belonging to `user` on `host`.
///
/// No matching samples gives zero sums.
pub fn aggregate(
    samples: &[ResourceSample],
    host: &Host,
    user: &str,
    policy: UserMatch,
) -> ResourceSums {
    let mut sums = ResourceSums::default();
    let mut rss_kib = 0.0;
    for sample in samples
        .iter()
        .filter(|s| &s.host == host && policy.matches(&s.user, user))
    {
        sums.cpu_percent_sum += sample.cpu_percent;
        rss_kib += sample.rss_kib;
        sums.matched += 1;
    }
    sums.memory_gb = kib_to_gb(rss_kib);
    sums
}

/// Distinct user names that the match policy cannot tell apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmbiguousUsers {
    pub key: String,
    pub users: Vec<String>,
}

impl fmt::Display for AmbiguousUsers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "users {} share the prefix '{}' and cannot be told apart in process listings",
            self.users.join(", "),
            self.key
        )
    }
}

pub fn ambiguous_users<'a, I>(users: I, policy: UserMatch) -> Vec<AmbiguousUsers>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut groups: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for user in users {
        let group = groups.entry(policy.key(user)).or_default();
        if !group.contains(&user) {
            group.push(user);
        }
    }
    groups
        .into_iter()
        .filter(|(_, users)| users.len() > 1)
        .map(|(key, mut users)| {
            users.sort_unstable();
            AmbiguousUsers {
                key: key.to_string(),
                users: users.into_iter().map(String::from).collect(),
            }
        })
        .collect()
}

/// Parse `ps -eo user:<w>,pcpu,rss --no-headers` output from `host`.
pub fn parse_ps_output(host: &Host, text: &str) -> Vec<ResourceSample> {
    let mut samples = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.is_empty() {
            continue;
        }
        let parsed = match fields[..] {
            [user, cpu, rss] => cpu
                .parse::<f64>()
                .ok()
                .zip(rss.parse::<f64>().ok())
                .map(|(cpu, rss)| (user, cpu, rss)),
            _ => None,
        };
        match parsed {
            Some((user, cpu_percent, rss_kib)) => samples.push(ResourceSample {
                host: host.clone(),
                user: user.to_string(),
                cpu_percent,
                rss_kib,
            }),
            None => tracing::warn!(
                "{}: skipping malformed process line {}: {}",
                host,
                lineno + 1,
                line.trim()
            ),
        }
    }
    samples
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(host: &str, user: &str, cpu: f64, rss: f64) -> ResourceSample {
        ResourceSample {
            host: Host::from(host),
            user: user.to_string(),
            cpu_percent: cpu,
            rss_kib: rss,
        }
    }

    #[test]
    fn test_aggregate_sums_matching_samples() {
        let samples = vec![
            sample("dn001", "asmith", 99.5, 1024.0 * 1024.0),
            sample("dn001", "asmith", 50.5, 1024.0 * 1024.0),
            sample("dn001", "root", 3.0, 2048.0),
            sample("dn002", "asmith", 100.0, 4096.0),
        ];
        let sums = aggregate(&samples, &Host::from("dn001"), "asmith", UserMatch::Exact);
        assert_eq!(sums.cpu_percent_sum, 150.0);
        assert_eq!(sums.cores(), 1.5);
        assert_eq!(sums.memory_gb, 2.0);
        assert_eq!(sums.matched, 2);
    }

    #[test]
    fn test_aggregate_no_match_is_zero() {
        let samples = vec![sample("dn001", "root", 3.0, 2048.0)];
        let sums = aggregate(&samples, &Host::from("dn001"), "asmith", UserMatch::default());
        assert_eq!(sums, ResourceSums::default());
    }

    #[test]
    fn test_prefix_match_truncated_names() {
        let policy = UserMatch::Prefix(7);
        assert!(policy.matches("abcdefg+", "abcdefghij"));
        assert!(policy.matches("asmith", "asmith"));
        assert!(!policy.matches("asmith", "bsmith"));
        assert!(!UserMatch::Exact.matches("abcdefg+", "abcdefghij"));

        let samples = vec![sample("dg012", "abcdefg+", 200.0, 0.0)];
        let sums = aggregate(&samples, &Host::from("dg012"), "abcdefghij", policy);
        assert_eq!(sums.cores(), 2.0);
    }

    #[test]
    fn test_ambiguous_users() {
        let users = ["jonathan1", "jonathan2", "asmith", "jonathan1", "bjones"];
        let groups = ambiguous_users(users, UserMatch::Prefix(7));
        assert_eq!(
            groups,
            vec![AmbiguousUsers {
                key: "jonatha".into(),
                users: vec!["jonathan1".into(), "jonathan2".into()],
            }]
        );
        assert!(ambiguous_users(users, UserMatch::Exact).is_empty());
    }

    #[test]
    fn test_user_match_from_str() {
        assert_eq!("exact".parse::<UserMatch>(), Ok(UserMatch::Exact));
        assert_eq!("prefix:8".parse::<UserMatch>(), Ok(UserMatch::Prefix(8)));
        assert_eq!("7".parse::<UserMatch>(), Ok(UserMatch::Prefix(7)));
        assert!("0".parse::<UserMatch>().is_err());
        assert!("fuzzy".parse::<UserMatch>().is_err());
        assert_eq!(UserMatch::Prefix(7).ps_width(), 8);
    }

    #[test]
    fn test_parse_ps_output() {
        let host = Host::from("dn004");
        let text = "\
asmith    99.8 2097152
root       0.0   10240
abcdefg+ 150.0  524288
broken line here too
bjones     abc    100
";
        let samples = parse_ps_output(&host, text);
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0], sample("dn004", "asmith", 99.8, 2097152.0));
        assert_eq!(samples[2].user, "abcdefg+");
    }
}
