//! Raw joint name -> lexical tokens -> canonical key.

use super::CanonicalKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Proximal,
    Intermediate,
    Distal,
    End,
}

impl Segment {
    pub fn as_str(self) -> &'static str {
        match self {
            Segment::Proximal => "proximal",
            Segment::Intermediate => "intermediate",
            Segment::Distal => "distal",
            Segment::End => "end",
        }
    }
}

const COMPOUNDS: [(&str, [&str; 2]); 5] = [
    ("upperarm", ["upper", "arm"]),
    ("lowerarm", ["lower", "arm"]),
    ("upperleg", ["upper", "leg"]),
    ("lowerleg", ["lower", "leg"]),
    ("upperchest", ["upper", "chest"]),
];

/// Splits a raw joint name into lowercase tokens.
///
/// `_`, `.` and `-` separate tokens, as do lower->upper, letter->digit and
/// digit->letter transitions. Known compounds such as `upperarm` are expanded.
pub fn tokenize(raw: &str) -> Vec<String> {
    let mut spaced = String::with_capacity(raw.len() + 8);
    let mut prev: Option<char> = None;
    for c in raw.chars() {
        let c = match c {
            '_' | '.' | '-' => ' ',
            other => other,
        };
        if let Some(p) = prev {
            let boundary = (p.is_lowercase() && c.is_uppercase())
                || (p.is_alphabetic() && c.is_ascii_digit())
                || (p.is_ascii_digit() && c.is_alphabetic());
            if boundary {
                spaced.push(' ');
            }
        }
        spaced.push(c);
        prev = Some(c);
    }

    let mut tokens = Vec::new();
    for word in spaced.split_whitespace() {
        let word = word.to_lowercase();
        match COMPOUNDS.iter().find(|(compound, _)| *compound == word) {
            Some((_, parts)) => tokens.extend(parts.iter().map(|p| p.to_string())),
            None => tokens.push(word),
        }
    }
    tokens
}

fn normalize_token(token: &str) -> &str {
    match token {
        "sholder" => "shoulder",
        "toes" => "toe",
        "fingers" => "finger",
        "proxima" => "proximal",
        "little" => "pinky",
        other => other,
    }
}

fn take_side(tokens: &mut Vec<String>) -> Option<Side> {
    let (at, side) = tokens.iter().enumerate().rev().find_map(|(i, t)| {
        let side = match t.as_str() {
            "left" | "l" => Side::Left,
            "right" | "r" => Side::Right,
            _ => return None,
        };
        Some((i, side))
    })?;
    tokens.remove(at);
    Some(side)
}

fn take_segment(tokens: &mut Vec<String>) -> Option<Segment> {
    let (at, segment) = tokens.iter().enumerate().rev().find_map(|(i, t)| {
        let segment = match normalize_token(t) {
            "1" | "proximal" | "prox" => Segment::Proximal,
            "2" | "intermediate" | "inter" => Segment::Intermediate,
            "3" | "distal" => Segment::Distal,
            "end" | "tip" => Segment::End,
            _ => return None,
        };
        Some((i, segment))
    })?;
    tokens.remove(at);
    Some(segment)
}

fn detect_base(tokens: &[String]) -> Option<&'static str> {
    let has = |word: &str| tokens.iter().any(|t| normalize_token(t) == word);

    let base = if has("hips") {
        "hips"
    } else if has("spine") {
        "spine"
    } else if has("upper") && has("chest") {
        "upper_chest"
    } else if has("chest") {
        "chest"
    } else if has("neck") {
        "neck"
    } else if has("head") {
        "head"
    } else if has("eye") {
        "eye"
    } else if has("shoulder") {
        "shoulder"
    } else if has("upper") && has("arm") {
        "arm"
    } else if (has("lower") && has("arm")) || has("forearm") {
        "forearm"
    } else if has("hand") {
        "hand"
    } else if has("thumb") {
        "thumb"
    } else if has("index") {
        "index"
    } else if has("middle") {
        "middle"
    } else if has("ring") {
        "ring"
    } else if has("pinky") {
        "pinky"
    } else if (has("upper") && has("leg")) || has("thigh") {
        "thigh"
    } else if (has("lower") && has("leg")) || has("calf") {
        "calf"
    } else if has("foot") {
        "foot"
    } else if has("toe") {
        "toe"
    } else {
        return None;
    };
    Some(base)
}

/// Derives a canonical key (`{side}_{base}_{segment}`) from a raw joint name.
///
/// Returns `None` when no base joint word is recognised.
pub fn canonical_key(raw: &str) -> Option<CanonicalKey> {
    let mut tokens = tokenize(raw);
    if tokens.is_empty() {
        return None;
    }
    let side = take_side(&mut tokens);
    let segment = take_segment(&mut tokens);
    let base = detect_base(&tokens)?;
    Some(CanonicalKey::compose(side, base, segment))
}
