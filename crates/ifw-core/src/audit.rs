//! Audit record construction (§6 "Audit records"), including the capped
//! package-join algorithm exercised by scenario S8.

use ifw_events::{AuditEvent, CallerInfo, DispatchKind, Intent};

const JOIN_HARD_CAP: usize = 150;
const JOIN_SOFT_CAP: usize = 125;
const TRUNCATED_TAIL: usize = 149;

/// Builds the `callerPackagesJoined` field: packages joined by `,`, capped
/// at 150 characters total, stopping early once the buffer passes 125
/// characters; if even the first package alone doesn't fit, its last 149
/// characters are emitted with a trailing `-` (§6, scenario S8).
pub fn join_packages(packages: &[String]) -> String {
    let mut buf = String::new();

    for package in packages {
        let candidate_len = if buf.is_empty() {
            package.len()
        } else {
            buf.len() + 1 + package.len()
        };

        if candidate_len > JOIN_HARD_CAP {
            if buf.is_empty() {
                return truncate_single(package);
            }
            break;
        }

        if !buf.is_empty() {
            buf.push(',');
        }
        buf.push_str(package);

        if buf.len() > JOIN_SOFT_CAP {
            break;
        }
    }

    buf
}

fn truncate_single(package: &str) -> String {
    let chars: Vec<char> = package.chars().collect();
    let tail: String = if chars.len() > TRUNCATED_TAIL {
        chars[chars.len() - TRUNCATED_TAIL..].iter().collect()
    } else {
        package.to_string()
    };
    format!("{tail}-")
}

/// Assembles the audit record for a logged denial or logged query on the
/// intent-dispatch path.
pub fn build_event(
    kind: DispatchKind,
    short_component: Option<String>,
    caller: &CallerInfo,
    intent: Option<&Intent>,
    resolved_type: Option<String>,
) -> AuditEvent {
    let data_string = intent
        .and_then(|i| i.data.as_ref())
        .and_then(|d| d.full.clone());
    AuditEvent {
        kind,
        short_component,
        caller_uid: caller.uid,
        caller_package_count: caller.packages.len(),
        caller_packages_joined: join_packages(&caller.packages),
        action: intent.and_then(|i| i.action.clone()),
        resolved_type,
        data_string,
        intent_flags: intent.map(|i| i.flags).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_stays_under_hard_cap() {
        let packages: Vec<String> = ["aaaa", "bbbb", "cccc"]
            .iter()
            .flat_map(|p| std::iter::repeat(p.to_string()).take(40))
            .collect();
        let joined = join_packages(&packages);
        assert!(joined.len() <= JOIN_HARD_CAP, "len was {}", joined.len());
    }

    #[test]
    fn join_stops_once_soft_cap_exceeded() {
        let packages: Vec<String> = (0..50).map(|i| format!("pkg{i}")).collect();
        let joined = join_packages(&packages);
        assert!(joined.len() > JOIN_SOFT_CAP);
        assert!(joined.len() <= JOIN_HARD_CAP);
    }

    #[test]
    fn single_oversized_package_is_tail_truncated() {
        let huge = "p".repeat(200);
        let joined = join_packages(&[huge]);
        assert_eq!(joined.len(), TRUNCATED_TAIL + 1);
        assert!(joined.ends_with('-'));
    }

    #[test]
    fn empty_list_joins_to_empty_string() {
        assert_eq!(join_packages(&[]), "");
    }
}
