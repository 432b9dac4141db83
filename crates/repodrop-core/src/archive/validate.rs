//! Member-list checks that run before anything touches disk.

use crate::config::ArchiveLimits;
use crate::error::ArchiveRejection;

/// Returns `true` when `member` is anchored at a filesystem root or drive.
fn is_rooted(member: &str) -> bool {
    if member.starts_with('/') || member.starts_with('\\') {
        return true;
    }
    let bytes = member.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Returns `true` for rooted paths and for any path containing `..`.
///
/// The `..` test is a substring match, so names like `a..b` are refused too.
pub fn is_traversal(member: &str) -> bool {
    is_rooted(member) || member.contains("..")
}

/// Nesting depth of a member path: the number of separators it contains.
pub fn member_depth(member: &str) -> usize {
    member.chars().filter(|c| matches!(c, '/' | '\\')).count()
}

/// Accept or reject an archive from its member names alone.
///
/// The count limit is checked once up front; each member is then checked for
/// traversal before nesting. The first failure rejects the whole archive.
pub fn validate_members<S: AsRef<str>>(
    members: &[S],
    limits: &ArchiveLimits,
) -> Result<(), ArchiveRejection> {
    if members.len() > limits.max_members {
        return Err(ArchiveRejection::TooManyFiles {
            count: members.len(),
            limit: limits.max_members,
        });
    }

    for member in members {
        let member = member.as_ref();
        if is_traversal(member) {
            return Err(ArchiveRejection::PathTraversal {
                member: member.to_string(),
            });
        }

        let depth = member_depth(member);
        if depth > limits.max_depth {
            return Err(ArchiveRejection::ExcessiveNesting {
                member: member.to_string(),
                depth,
                limit: limits.max_depth,
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> ArchiveLimits {
        ArchiveLimits::default()
    }

    #[test]
    fn test_accepts_ordinary_repository_layout() {
        let members = ["repo/", "repo/.git/", "repo/.git/config", "repo/src/main.rs"];
        assert!(validate_members(&members, &limits()).is_ok());
    }

    #[test]
    fn test_rejects_parent_segment() {
        let err = validate_members(&["ok.txt", "a/../../etc/passwd"], &limits()).unwrap_err();
        assert!(matches!(err, ArchiveRejection::PathTraversal { member } if member == "a/../../etc/passwd"));
    }

    #[test]
    fn test_rejects_rooted_paths() {
        for member in ["/etc/passwd", "\\windows\\system32", "C:evil", "c:/evil"] {
            assert!(
                matches!(
                    validate_members(&[member], &limits()),
                    Err(ArchiveRejection::PathTraversal { .. })
                ),
                "expected traversal rejection for {member}"
            );
        }
    }

    #[test]
    fn test_rejects_dotdot_substring() {
        assert!(is_traversal("notes..txt"));
    }

    #[test]
    fn test_count_limit_applies_even_when_members_are_valid() {
        let members: Vec<String> = (0..151).map(|i| format!("f{i}.txt")).collect();
        let err = validate_members(&members, &limits()).unwrap_err();
        assert_eq!(
            err,
            ArchiveRejection::TooManyFiles {
                count: 151,
                limit: 150
            }
        );
    }

    #[test]
    fn test_exactly_at_count_limit_is_accepted() {
        let members: Vec<String> = (0..150).map(|i| format!("f{i}.txt")).collect();
        assert!(validate_members(&members, &limits()).is_ok());
    }

    #[test]
    fn test_nesting_limit() {
        assert!(validate_members(&["a/b/c/d/e/f/g"], &limits()).is_ok());
        let err = validate_members(&["a/b/c/d/e/f/g/h"], &limits()).unwrap_err();
        assert!(matches!(
            err,
            ArchiveRejection::ExcessiveNesting { depth: 7, limit: 6, .. }
        ));
    }

    #[test]
    fn test_backslashes_count_toward_depth() {
        assert_eq!(member_depth("a\\b/c"), 2);
    }

    #[test]
    fn test_traversal_reported_before_nesting_for_same_member() {
        let err = validate_members(&["a/b/c/d/e/f/g/../h"], &limits()).unwrap_err();
        assert!(matches!(err, ArchiveRejection::PathTraversal { .. }));
    }
}
