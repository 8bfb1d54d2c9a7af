//! Left/right bone pairing by name.
//!
//! Pairing is a plain token substitution over the bone path. Rigs naming their
//! sides with markers missing from [`MIRROR_TOKENS`] never pair.

use lookdev::scene::TransformAccess;

/// Side markers tried in order. First substitution that resolves wins.
pub const MIRROR_TOKENS: [(&str, &str); 4] = [
    (" L", " R"),
    ("_L", "_R"),
    ("_Left", "_Right"),
    ("Left_", "Right_"),
];

/// Candidate mirrored paths in the order they are tried.
///
/// A marker is substituted only where it stands as a whole token, so
/// `Armature_Rig` keeps its name while `Arm_R` becomes `Arm_L`. Every such
/// occurrence along the path is substituted.
pub fn mirrored_paths(path: &str) -> impl Iterator<Item = String> + '_ {
    MIRROR_TOKENS.iter().filter_map(move |&(left, right)| {
        replace_tokens(path, left, right)
            .or_else(|| replace_tokens(path, right, left))
    })
}

/// Replaces token occurrences of `from`. `None` if there are none.
fn replace_tokens(text: &str, from: &str, to: &str) -> Option<String> {
    let mut result = String::with_capacity(text.len());
    let mut last = 0;

    for (start, _) in text.match_indices(from) {
        if start < last || !is_token(text, start, from) {
            continue;
        }
        result.push_str(&text[last..start]);
        result.push_str(to);
        last = start + from.len();
    }

    if last == 0 {
        return None;
    }
    result.push_str(&text[last..]);
    Some(result)
}

/// Marker letters must not run into neighbouring letters or digits.
fn is_token(text: &str, start: usize, marker: &str) -> bool {
    let end = start + marker.len();
    let joins = |c: Option<char>| c.map_or(false, char::is_alphanumeric);

    let starts_alphanumeric = joins(marker.chars().next());
    let ends_alphanumeric = joins(marker.chars().last());

    !(starts_alphanumeric && joins(text[..start].chars().last()))
        && !(ends_alphanumeric && joins(text[end..].chars().next()))
}

/// Finds counterpart of the node at `path` under `root`.
pub fn find_symmetrical_node<A>(
    access: &A,
    root: A::Node,
    path: &str,
) -> Option<(String, A::Node)>
where
    A: TransformAccess + ?Sized,
{
    mirrored_paths(path).find_map(|candidate| {
        let node = access.find_by_path(root, &candidate)?;
        Some((candidate, node))
    })
}
