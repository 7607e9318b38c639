use rand::Rng;
use rand::seq::SliceRandom;
use tracing_appender::non_blocking::NonBlocking;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Lowercase alphabet for generated resource names (DNS-safe).
const NAME_ALPHABET: [char; 36] = [
    'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r',
    's', 't', 'u', 'v', 'w', 'x', 'y', 'z', '0', '1', '2', '3', '4', '5', '6', '7', '8', '9',
];

const UPPER: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOWER: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const DIGITS: &[u8] = b"0123456789";

///
/// With `stderr` set, the same events are also written to stderr through a
/// second layer of the one registry.
pub fn register_to_tracing(non_blocking: NonBlocking, env_filter: EnvFilter, stderr: bool) {
    let stderr_layer = stderr.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
    });

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .with_ansi(false),
        )
        .with(stderr_layer)
        .try_init();
}

/// `{prefix}-{n random chars}`.
pub fn random_name(prefix: &str, len: usize) -> String {
    format!("{}-{}", prefix, nanoid::nanoid!(len, &NAME_ALPHABET))
}

/// Derive a cluster name from a profile name.
///
/// The leading product segment of the profile name is replaced by `prefix`
/// (`rosa-sts-ad` becomes `rhcs-sts-ad-x7k`). `suffix` replaces the random tail.
pub fn generate_cluster_name(profile_name: &str, prefix: &str, suffix: Option<&str>) -> String {
    let body = match profile_name.split_once('-') {
        Some((_, rest)) if !rest.is_empty() => rest,
        _ => profile_name,
    };
    let base = format!("{prefix}-{body}");
    match suffix {
        Some(s) if !s.is_empty() => format!("{base}-{s}"),
        _ => random_name(&base, 3),
    }
}

/// Password accepted by the cluster admin identity provider.
///
/// Always contains at least one uppercase letter, one lowercase letter and one digit.
pub fn random_password(len: usize) -> String {
    let len = len.max(3);
    let mut rng = rand::rng();
    let pool: Vec<u8> = [UPPER, LOWER, DIGITS].concat();

    let mut bytes = vec![
        UPPER[rng.random_range(0..UPPER.len())],
        LOWER[rng.random_range(0..LOWER.len())],
        DIGITS[rng.random_range(0..DIGITS.len())],
    ];
    while bytes.len() < len {
        bytes.push(pool[rng.random_range(0..pool.len())]);
    }
    bytes.shuffle(&mut rng);

    bytes.into_iter().map(char::from).collect()
}

/// `4.14.3` -> `4.14`. Returns the input when it has fewer than two components.
pub fn major_minor(version: &str) -> String {
    let mut parts = version.split('.');
    match (parts.next(), parts.next()) {
        (Some(major), Some(minor)) => format!("{major}.{minor}"),
        _ => version.to_string(),
    }
}

/// Split a comma separated list, dropping empty entries.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cluster_name_replaces_product_segment() {
        let name = generate_cluster_name("rosa-sts-ad", "rhcs", None);
        assert!(name.starts_with("rhcs-sts-ad-"), "{name}");
        assert_eq!(name.len(), "rhcs-sts-ad-".len() + 3);
    }

    #[test]
    fn cluster_name_uses_fixed_suffix() {
        assert_eq!(
            generate_cluster_name("rosa-up-y", "ci", Some("01")),
            "ci-up-y-01"
        );
    }

    #[test]
    fn cluster_name_without_dash_keeps_profile_name() {
        let name = generate_cluster_name("smoke", "rhcs", Some("a"));
        assert_eq!(name, "rhcs-smoke-a");
    }

    #[test]
    fn password_has_required_classes() {
        for _ in 0..32 {
            let pw = random_password(14);
            assert_eq!(pw.len(), 14);
            assert!(pw.chars().any(|c| c.is_ascii_uppercase()));
            assert!(pw.chars().any(|c| c.is_ascii_lowercase()));
            assert!(pw.chars().any(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn major_minor_trims_patch() {
        assert_eq!(major_minor("4.14.3"), "4.14");
        assert_eq!(major_minor("4.15.0-rc.1"), "4.15");
        assert_eq!(major_minor("4"), "4");
    }

    #[test]
    fn split_list_ignores_blanks() {
        assert_eq!(split_list("a, b,,c "), vec!["a", "b", "c"]);
        assert!(split_list("").is_empty());
    }
}
