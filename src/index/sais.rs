//! Suffix array construction by induced sorting (SA-IS).

const EMPTY: usize = usize::MAX;

/// Build the suffix array of `input`.
///
/// Bytes are shifted up by one so that a unique, smallest sentinel can be appended;
/// the sentinel's suffix is dropped from the result.
pub(crate) fn suffix_array(input: &[u8]) -> Vec<usize> {
    match input.len() {
        0 => return Vec::new(),
        1 => return vec![0],
        _ => (),
    }

    let mut text: Vec<usize> = Vec::with_capacity(input.len() + 1);
    text.extend(input.iter().map(|&b| b as usize + 1));
    text.push(0);

    let sa = sais(&text, 257);
    // sa[0] is always the sentinel
    sa[1..].to_vec()
}

/// SA-IS over an integer text in `[0, alphabet)` that ends with a unique smallest sentinel.
fn sais(text: &[usize], alphabet: usize) -> Vec<usize> {
    let n = text.len();
    match n {
        0 => return Vec::new(),
        1 => return vec![0],
        2 => return vec![1, 0],
        _ => (),
    }

    // S-type: text[i..] < text[i+1..]; the sentinel is S
    let mut is_s = vec![false; n];
    is_s[n - 1] = true;
    for i in (0..n - 1).rev() {
        is_s[i] = text[i] < text[i + 1] || (text[i] == text[i + 1] && is_s[i + 1]);
    }
    let is_lms = |i: usize| i > 0 && is_s[i] && !is_s[i - 1];

    let lms: Vec<usize> = (1..n).filter(|&i| is_lms(i)).collect();

    // first pass: sort LMS substrings
    let mut sa = vec![EMPTY; n];
    place_lms(text, alphabet, &mut sa, lms.iter().rev().copied());
    induce(text, alphabet, &is_s, &mut sa);

    // name LMS substrings in sorted order
    let mut names = vec![EMPTY; n];
    let mut name = 0;
    let mut prev: Option<usize> = None;
    for &pos in sa.iter().filter(|&&p| p != EMPTY && is_lms(p)) {
        if let Some(prev) = prev {
            if !lms_substrings_equal(text, &is_s, prev, pos) {
                name += 1;
            }
        }
        names[pos] = name;
        prev = Some(pos);
    }
    let distinct = name + 1;

    let sorted_lms: Vec<usize> = if distinct < lms.len() {
        // names collide: recurse on the reduced string
        let reduced: Vec<usize> = lms.iter().map(|&p| names[p]).collect();
        sais(&reduced, distinct)
            .into_iter()
            .map(|i| lms[i])
            .collect()
    } else {
        let mut sorted = vec![0; lms.len()];
        for &p in &lms {
            sorted[names[p]] = p;
        }
        sorted
    };

    // second pass: induce the final order from correctly sorted LMS suffixes
    sa.iter_mut().for_each(|s| *s = EMPTY);
    place_lms(text, alphabet, &mut sa, sorted_lms.iter().rev().copied());
    induce(text, alphabet, &is_s, &mut sa);

    sa
}

fn bucket_bounds(text: &[usize], alphabet: usize, tails: bool) -> Vec<usize> {
    let mut buckets = vec![0usize; alphabet];
    for &c in text {
        buckets[c] += 1;
    }
    let mut sum = 0;
    for b in buckets.iter_mut() {
        sum += *b;
        *b = if tails { sum } else { sum - *b };
    }
    buckets
}

/// Place LMS positions (given from largest to smallest) at their bucket tails.
fn place_lms<I>(text: &[usize], alphabet: usize, sa: &mut [usize], lms_desc: I)
where
    I: Iterator<Item = usize>,
{
    let mut tails = bucket_bounds(text, alphabet, true);
    for p in lms_desc {
        let c = text[p];
        tails[c] -= 1;
        sa[tails[c]] = p;
    }
}

/// Induce L-type suffixes left to right, then S-type suffixes right to left.
fn induce(text: &[usize], alphabet: usize, is_s: &[bool], sa: &mut [usize]) {
    let n = text.len();

    let mut heads = bucket_bounds(text, alphabet, false);
    for i in 0..n {
        let s = sa[i];
        if s == EMPTY || s == 0 {
            continue;
        }
        let j = s - 1;
        if !is_s[j] {
            let c = text[j];
            sa[heads[c]] = j;
            heads[c] += 1;
        }
    }

    let mut tails = bucket_bounds(text, alphabet, true);
    for i in (0..n).rev() {
        let s = sa[i];
        if s == EMPTY || s == 0 {
            continue;
        }
        let j = s - 1;
        if is_s[j] {
            let c = text[j];
            tails[c] -= 1;
            sa[tails[c]] = j;
        }
    }
}

fn lms_substrings_equal(text: &[usize], is_s: &[bool], a: usize, b: usize) -> bool {
    let n = text.len();
    let is_lms = |i: usize| i > 0 && is_s[i] && !is_s[i - 1];
    let mut i = 0;
    loop {
        let (ai, bi) = (a + i, b + i);
        if ai >= n || bi >= n {
            return false;
        }
        if text[ai] != text[bi] || is_s[ai] != is_s[bi] {
            return false;
        }
        if i > 0 {
            let (a_end, b_end) = (is_lms(ai), is_lms(bi));
            if a_end || b_end {
                return a_end && b_end;
            }
        }
        i += 1;
    }
}
