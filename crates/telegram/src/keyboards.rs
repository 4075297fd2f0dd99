use serde::Serialize;

use leadline_core::dialogue::MenuKind;
use leadline_core::segment::Segment;

use crate::update::{BACK_TO_SEGMENTS_CALLBACK, BRIEF_START_CALLBACK, SEGMENT_CALLBACK_PREFIX};

/// Bot API `reply_markup` payload for inline buttons.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InlineKeyboard {
    pub inline_keyboard: Vec<Vec<InlineButton>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InlineButton {
    pub text: String,
    pub callback_data: String,
}

impl InlineButton {
    fn new(text: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self { text: text.into(), callback_data: callback_data.into() }
    }
}

pub fn keyboard_for(menu: MenuKind) -> InlineKeyboard {
    match menu {
        MenuKind::Segments => segment_menu(),
        MenuKind::BriefConfirm => brief_confirm(),
    }
}

/// One button per segment, plus the shortcut straight into the brief.
pub fn segment_menu() -> InlineKeyboard {
    let mut rows: Vec<Vec<InlineButton>> = Segment::ALL
        .iter()
        .map(|segment| {
            vec![InlineButton::new(
                segment_label(*segment),
                format!("{SEGMENT_CALLBACK_PREFIX}{}", segment.as_str()),
            )]
        })
        .collect();
    rows.push(vec![InlineButton::new("📝 Quick brief (1 min)", BRIEF_START_CALLBACK)]);

    InlineKeyboard { inline_keyboard: rows }
}

pub fn brief_confirm() -> InlineKeyboard {
    InlineKeyboard {
        inline_keyboard: vec![
            vec![InlineButton::new("✅ Yes, start the brief", BRIEF_START_CALLBACK)],
            vec![InlineButton::new("↩️ Back to directions", BACK_TO_SEGMENTS_CALLBACK)],
        ],
    }
}

fn segment_label(segment: Segment) -> String {
    let icon = match segment {
        Segment::Specialist => "👤",
        Segment::Business => "🏢",
        Segment::Event => "🎤",
        Segment::Teambuilding => "🤝",
    };
    format!("{icon} {}", segment.title())
}
