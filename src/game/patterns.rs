use once_cell::sync::Lazy;
use regex::Regex;

/// 结束游戏的短语，按顺序、不区分大小写匹配
///
/// 仅出现重新开始的提示不算结束
static TERMINATION_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    [
        ("death", r"(?i)you have died|you are dead|you died"),
        ("game_over", r"(?i)game over"),
        ("the_end", r"(?i)the end"),
        ("victory", r"(?i)you have won|you win"),
        ("thanks_for_playing", r"(?i)thanks? (you )?for playing"),
    ]
    .into_iter()
    .map(|(label, pattern)| {
        let regex = Regex::new(pattern).expect("termination pattern should compile");
        (label, regex)
    })
    .collect()
});

static SCORE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Score:\s*(\d+)").expect("score pattern should compile"));
static MOVES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Moves:\s*(\d+)").expect("moves pattern should compile"));

/// `text` 中第一个命中的结束模式的标签
pub fn termination_reason(text: &str) -> Option<&'static str> {
    TERMINATION_PATTERNS
        .iter()
        .find(|(_, regex)| regex.is_match(text))
        .map(|(label, _)| *label)
}

pub fn is_game_over(text: &str) -> bool {
    termination_reason(text).is_some()
}

fn last_number(regex: &Regex, text: &str) -> Option<u32> {
    regex
        .captures_iter(text)
        .filter_map(|caps| caps.get(1)?.as_str().parse().ok())
        .last()
}

pub fn extract_score(text: &str) -> Option<u32> {
    last_number(&SCORE, text)
}

pub fn extract_moves(text: &str) -> Option<u32> {
    last_number(&MOVES, text)
}

/// 分数与步数；文本中没有时保留上一次的值
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Progress {
    pub score: Option<u32>,
    pub moves: Option<u32>,
}

impl Progress {
    pub fn observe(&mut self, text: &str) {
        if let Some(score) = extract_score(text) {
            self.score = Some(score);
        }
        if let Some(moves) = extract_moves(text) {
            self.moves = Some(moves);
        }
    }

    pub fn score_or_zero(&self) -> u32 {
        self.score.unwrap_or(0)
    }

    pub fn moves_or_zero(&self) -> u32 {
        self.moves.unwrap_or(0)
    }
}
