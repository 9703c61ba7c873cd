use super::{VDConversationError, message::Message, prompts::SUMMARY_PROMPT};
use crate::llm::WireMessage;

/// Where a compaction pass cuts the history.
///
/// `history[..first]` is kept as context, `history[first..end]` is replaced by one
/// summary and `history[end..]` is kept verbatim. `end` itself is never summarized.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CompactionPlan {
    pub first: usize,
    pub end: usize,
    pub frames_removed: usize,
}

/// Finds the oldest run of frames to summarize.
///
/// The scan stops at the first user message after the first frame, or once it is
/// `recap_limit` positions past that frame.
pub fn plan(
    history: &[Message],
    recap_limit: usize,
) -> Result<CompactionPlan, VDConversationError> {
    let mut first: Option<usize> = None;
    let mut end: Option<usize> = None;
    for (i, msg) in history.iter().enumerate() {
        if first.is_none() && msg.is_frame() {
            first = Some(i);
        }
        if let Some(first) = first
            && (matches!(msg, Message::User(_)) || i - first >= recap_limit)
        {
            end = Some(i);
            break;
        }
    }

    let Some(first) = first else {
        return Err(VDConversationError::InvariantViolated(
            "compaction requested but history holds no frames".to_string(),
        ));
    };
    let Some(end) = end else {
        return Err(VDConversationError::InvariantViolated(format!(
            "compaction scan from index {first} ran past the end of {} messages",
            history.len()
        )));
    };

    let frames_removed = history[first..end].iter().filter(|m| m.is_frame()).count();
    Ok(CompactionPlan {
        first,
        end,
        frames_removed,
    })
}

/// Summarization prompt: instruction, then the kept context, then the span to summarize.
pub fn summary_prompt(history: &[Message], plan: &CompactionPlan) -> Vec<WireMessage> {
    std::iter::once(WireMessage::system(SUMMARY_PROMPT))
        .chain(history[..plan.end].iter().map(Message::to_wire))
        .collect()
}

/// Rebuilds the history around the summary. Messages outside the span are moved, not copied.
pub fn apply(mut history: Vec<Message>, plan: &CompactionPlan, summary: &str) -> Vec<Message> {
    let after = history.split_off(plan.end);
    history.truncate(plan.first);
    history.reserve(after.len() + 1);
    history.push(Message::frame_summary(summary));
    history.extend(after);
    history
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(tag: u8) -> Message {
        Message::frame(vec![0xff, 0xd8, 0xff, tag])
    }

    #[test]
    fn test_plan_only_frames_keeps_last() {
        let history: Vec<Message> = (1..=4).map(frame).collect();
        let plan = plan(&history, 3).unwrap();
        assert_eq!(
            plan,
            CompactionPlan {
                first: 0,
                end: 3,
                frames_removed: 3
            }
        );
    }

    #[test]
    fn test_plan_stops_at_user_message() {
        let history = vec![
            Message::frame_summary("earlier"),
            Message::Assistant("hello".into()),
            frame(1),
            Message::User("what do you see?".into()),
            Message::Assistant("a desk".into()),
            frame(2),
            frame(3),
            frame(4),
        ];
        let plan = plan(&history, 3).unwrap();
        assert_eq!(plan.first, 2);
        assert_eq!(plan.end, 3);
        assert_eq!(plan.frames_removed, 1);
    }

    #[test]
    fn test_plan_counts_only_frames() {
        let history = vec![
            frame(1),
            Message::Assistant("interjection".into()),
            frame(2),
            frame(3),
            frame(4),
        ];
        let plan = plan(&history, 3).unwrap();
        assert_eq!(plan.end, 3);
        assert_eq!(plan.frames_removed, 2);
    }

    #[test]
    fn test_plan_without_frames_is_error() {
        let history = vec![Message::User("hi".into()), Message::Assistant("hey".into())];
        assert!(matches!(
            plan(&history, 3),
            Err(VDConversationError::InvariantViolated(_))
        ));
    }

    #[test]
    fn test_plan_exhausted_scan_is_error() {
        let history = vec![frame(1), frame(2)];
        assert!(matches!(
            plan(&history, 3),
            Err(VDConversationError::InvariantViolated(_))
        ));
    }

    #[test]
    fn test_summary_prompt_excludes_after() {
        let history = vec![
            Message::Assistant("context".into()),
            frame(1),
            frame(2),
            frame(3),
        ];
        let plan = plan(&history, 2).unwrap();
        let prompt = summary_prompt(&history, &plan);
        assert_eq!(prompt.len(), 1 + plan.end);
        assert_eq!(prompt[0], WireMessage::system(SUMMARY_PROMPT));
        assert_eq!(prompt[1], history[0].to_wire());
        assert_eq!(prompt.last(), Some(&history[2].to_wire()));
    }

    #[test]
    fn test_apply_replaces_span() {
        let history = vec![
            Message::Assistant("context".into()),
            frame(1),
            frame(2),
            frame(3),
            Message::User("hi".into()),
        ];
        let plan = CompactionPlan {
            first: 1,
            end: 3,
            frames_removed: 2,
        };
        let compacted = apply(history.clone(), &plan, "two frames");
        assert_eq!(
            compacted,
            vec![
                history[0].clone(),
                Message::frame_summary("two frames"),
                history[3].clone(),
                history[4].clone(),
            ]
        );
    }
}
