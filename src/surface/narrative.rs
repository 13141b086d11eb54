//! Dialogue pairs shown while the house is being struck, and the fixed copy
//! around them. Each pair couples a Lu Xun line with the student reality it
//! echoes.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Dialogue {
    pub quote: &'static str,
    pub reality: &'static str,
}

pub const DIALOGUES: [Dialogue; 5] = [
    Dialogue {
        quote: "从来如此，便对么？",
        reality: "所有人都补课，我就得补，这真的对吗？",
    },
    Dialogue {
        quote: "救救孩子……",
        reality: "谁来救救被题海淹没的我们？",
    },
    Dialogue {
        quote: "愿中国青年都摆脱冷气，只是向上走。",
        reality: "我们不想做冷漠的刷题机器，我们要热气腾腾地活着。",
    },
    Dialogue {
        quote: "真的猛士，敢于直面惨淡的人生。",
        reality: "哪怕在分数至上的世界里，我也要守住我的灵魂。",
    },
    Dialogue {
        quote: "不在沉默中爆发，就在沉默中灭亡。",
        reality: "我不再沉默，我要发出我的声音。",
    },
];

pub const IDLE_HEADING: &str = "铁屋子";
pub const ACTIVE_HEADING: &str = "打破它";
pub const IDLE_HINT: &str = "TAP TO BREAK THE SILENCE";
pub const REVEAL_HEADING: &str = "天亮了";
pub const REVEAL_QUOTE: &str = "愿中国青年都摆脱冷气，只是向上走。";
pub const REVEAL_CODA: &str = "既然醒了，就不要再装睡。";

/// `clamp(floor(hits / hits_per_stage), 0, len - 1)`.
pub fn stage_for_hits(hits: u32, hits_per_stage: u32, len: usize) -> usize {
    let stage = (hits / hits_per_stage.max(1)) as usize;
    stage.min(len.saturating_sub(1))
}

pub fn heading(hits: u32) -> &'static str {
    if hits == 0 { IDLE_HEADING } else { ACTIVE_HEADING }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_examples() {
        let len = DIALOGUES.len();
        assert_eq!(stage_for_hits(0, 3, len), 0);
        assert_eq!(stage_for_hits(2, 3, len), 0);
        assert_eq!(stage_for_hits(3, 3, len), 1);
        assert_eq!(stage_for_hits(5, 3, len), 1);
        assert_eq!(stage_for_hits(14, 3, len), 4);
        assert_eq!(stage_for_hits(15, 3, len), 4);
        assert_eq!(stage_for_hits(1_000, 3, len), 4);
    }

    #[test]
    fn degenerate_inputs_do_not_panic() {
        assert_eq!(stage_for_hits(7, 0, 5), 4);
        assert_eq!(stage_for_hits(7, 3, 0), 0);
    }

    #[test]
    fn heading_switches_after_first_hit() {
        assert_eq!(heading(0), IDLE_HEADING);
        assert_eq!(heading(1), ACTIVE_HEADING);
    }
}
