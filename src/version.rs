//! Per-ecosystem version ordering (spec §4.E step 4.f, §4.G "Diff"). Grounded
//! on `other_examples` RPM/DEB tooling conventions; no crate in the teacher's
//! stack implements EVR/dpkg comparison, so these are hand-written, with
//! `semver` reused for Helm per spec §4.D.

use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ecosystem {
    Rpm,
    Deb,
    Helm,
    Apk,
}

pub fn compare(ecosystem: Ecosystem, a: &str, b: &str) -> Ordering {
    match ecosystem {
        Ecosystem::Rpm => compare_evr(a, b),
        Ecosystem::Deb => compare_dpkg(a, b),
        Ecosystem::Helm => compare_semver(a, b),
        Ecosystem::Apk => compare_apk(a, b),
    }
}

/// RPM's epoch:version-release comparison, applied field-by-field with
/// `rpmvercmp`-style segment splitting (alternating alpha/numeric runs,
/// numeric compares numerically, alpha compares lexically, a missing segment
/// sorts below a present one, and a literal `~` sorts below everything else).
pub fn compare_evr(a: &str, b: &str) -> Ordering {
    let (epoch_a, rest_a) = split_epoch(a);
    let (epoch_b, rest_b) = split_epoch(b);
    match epoch_a.cmp(&epoch_b) {
        Ordering::Equal => {}
        other => return other,
    }
    let (version_a, release_a) = split_version_release(rest_a);
    let (version_b, release_b) = split_version_release(rest_b);
    match rpmvercmp(version_a, version_b) {
        Ordering::Equal => rpmvercmp(release_a, release_b),
        other => other,
    }
}

fn split_epoch(s: &str) -> (u64, &str) {
    match s.split_once(':') {
        Some((epoch, rest)) => (epoch.parse().unwrap_or(0), rest),
        None => (0, s),
    }
}

fn split_version_release(s: &str) -> (&str, &str) {
    match s.rsplit_once('-') {
        Some((version, release)) => (version, release),
        None => (s, ""),
    }
}

fn rpmvercmp(a: &str, b: &str) -> Ordering {
    let mut a_iter = a.chars().peekable();
    let mut b_iter = b.chars().peekable();

    loop {
        skip_non_alnum_tilde(&mut a_iter);
        skip_non_alnum_tilde(&mut b_iter);

        if a_iter.peek() == Some(&'~') || b_iter.peek() == Some(&'~') {
            match (a_iter.peek() == Some(&'~'), b_iter.peek() == Some(&'~')) {
                (true, true) => {
                    a_iter.next();
                    b_iter.next();
                    continue;
                }
                (true, false) => return Ordering::Less,
                (false, true) => return Ordering::Greater,
                (false, false) => unreachable!(),
            }
        }

        let (Some(&a_head), Some(&b_head)) = (a_iter.peek(), b_iter.peek()) else {
            break;
        };

        if a_head.is_ascii_digit() && b_head.is_ascii_digit() {
            let a_segment = take_while(&mut a_iter, |c| c.is_ascii_digit());
            let b_segment = take_while(&mut b_iter, |c| c.is_ascii_digit());
            let a_trimmed = a_segment.trim_start_matches('0');
            let b_trimmed = b_segment.trim_start_matches('0');
            match a_trimmed.len().cmp(&b_trimmed.len()).then_with(|| a_trimmed.cmp(b_trimmed)) {
                Ordering::Equal => continue,
                other => return other,
            }
        } else if a_head.is_alphabetic() && b_head.is_alphabetic() {
            let a_segment = take_while(&mut a_iter, |c| c.is_alphabetic());
            let b_segment = take_while(&mut b_iter, |c| c.is_alphabetic());
            match a_segment.cmp(&b_segment) {
                Ordering::Equal => continue,
                other => return other,
            }
        } else {
            // One side is numeric, the other alphabetic: numeric wins (newer).
            return if a_head.is_ascii_digit() { Ordering::Greater } else { Ordering::Less };
        }
    }

    match (a_iter.peek(), b_iter.peek()) {
        (None, None) => Ordering::Equal,
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (Some(_), Some(_)) => Ordering::Equal,
    }
}

fn skip_non_alnum_tilde(iter: &mut std::iter::Peekable<std::str::Chars<'_>>) {
    while let Some(&c) = iter.peek() {
        if c.is_alphanumeric() || c == '~' {
            break;
        }
        iter.next();
    }
}

fn take_while(iter: &mut std::iter::Peekable<std::str::Chars<'_>>, predicate: impl Fn(char) -> bool) -> String {
    let mut out = String::new();
    while let Some(&c) = iter.peek() {
        if !predicate(c) {
            break;
        }
        out.push(c);
        iter.next();
    }
    out
}

/// Debian policy §5.6.12 version comparison: epoch, then `upstream_version`
/// and `debian_revision` compared with dpkg's mixed alpha/digit rule (`~`
/// sorts before everything, including the empty string).
pub fn compare_dpkg(a: &str, b: &str) -> Ordering {
    let (epoch_a, rest_a) = split_epoch(a);
    let (epoch_b, rest_b) = split_epoch(b);
    match epoch_a.cmp(&epoch_b) {
        Ordering::Equal => {}
        other => return other,
    }
    let (upstream_a, revision_a) = split_version_release(rest_a);
    let (upstream_b, revision_b) = split_version_release(rest_b);
    match dpkg_segment_cmp(upstream_a, upstream_b) {
        Ordering::Equal => dpkg_segment_cmp(revision_a, revision_b),
        other => other,
    }
}

fn dpkg_segment_cmp(a: &str, b: &str) -> Ordering {
    let mut a_iter = a.chars().peekable();
    let mut b_iter = b.chars().peekable();
    loop {
        let a_alpha = take_while(&mut a_iter, |c| !c.is_ascii_digit());
        let b_alpha = take_while(&mut b_iter, |c| !c.is_ascii_digit());
        match dpkg_alpha_cmp(&a_alpha, &b_alpha) {
            Ordering::Equal => {}
            other => return other,
        }

        let a_digits = take_while(&mut a_iter, |c| c.is_ascii_digit());
        let b_digits = take_while(&mut b_iter, |c| c.is_ascii_digit());
        let a_num: u64 = a_digits.parse().unwrap_or(0);
        let b_num: u64 = b_digits.parse().unwrap_or(0);
        match a_num.cmp(&b_num) {
            Ordering::Equal => {}
            other => return other,
        }

        if a_iter.peek().is_none() && b_iter.peek().is_none() {
            return Ordering::Equal;
        }
    }
}

fn dpkg_alpha_cmp(a: &str, b: &str) -> Ordering {
    let mut a_chars = a.chars();
    let mut b_chars = b.chars();
    loop {
        let rank = |c: Option<char>| match c {
            None => 0,
            Some('~') => -1,
            Some(c) if c.is_alphabetic() => c as i32,
            Some(c) => 256 + c as i32,
        };
        let a_char = a_chars.next();
        let b_char = b_chars.next();
        if a_char.is_none() && b_char.is_none() {
            return Ordering::Equal;
        }
        match rank(a_char).cmp(&rank(b_char)) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
}

fn compare_semver(a: &str, b: &str) -> Ordering {
    let parsed_a = semver::Version::parse(a.trim_start_matches('v'));
    let parsed_b = semver::Version::parse(b.trim_start_matches('v'));
    match (parsed_a, parsed_b) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        _ => a.cmp(b),
    }
}

/// Alpine's `version-rN` scheme: base version compared first, then the `-rN`
/// package revision numerically (spec §8 "the highest by `-rN`... for a given
/// base version").
fn compare_apk(a: &str, b: &str) -> Ordering {
    let (base_a, rev_a) = split_apk_revision(a);
    let (base_b, rev_b) = split_apk_revision(b);
    match dpkg_segment_cmp(base_a, base_b) {
        Ordering::Equal => rev_a.cmp(&rev_b),
        other => other,
    }
}

fn split_apk_revision(s: &str) -> (&str, u64) {
    match s.rsplit_once("-r") {
        Some((base, revision)) if revision.chars().all(|c| c.is_ascii_digit()) && !revision.is_empty() => {
            (base, revision.parse().unwrap_or(0))
        }
        _ => (s, 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evr_orders_numeric_over_alpha() {
        assert_eq!(compare_evr("1.10-1", "1.9-1"), Ordering::Greater);
        assert_eq!(compare_evr("1.0", "1.0"), Ordering::Equal);
        assert_eq!(compare_evr("1:1.0-1", "2.0-1"), Ordering::Greater);
    }

    #[test]
    fn dpkg_tilde_sorts_before_anything() {
        assert_eq!(compare_dpkg("1.0~rc1", "1.0"), Ordering::Less);
        assert_eq!(compare_dpkg("1.0-1", "1.0-2"), Ordering::Less);
    }

    #[test]
    fn apk_revision_breaks_ties() {
        assert_eq!(compare_apk("1.0-r2", "1.0-r10"), Ordering::Less);
        assert_eq!(compare_apk("1.10", "1.9"), Ordering::Greater);
    }

    #[test]
    fn helm_uses_semver() {
        assert_eq!(compare_semver("1.2.0", "1.10.0"), Ordering::Less);
    }
}
