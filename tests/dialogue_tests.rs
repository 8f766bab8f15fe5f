use questflow::agent::{BoundedDialogue, MessageRole};

const ROLES: [MessageRole; 3] = [MessageRole::User, MessageRole::Assistant, MessageRole::Tool];

#[test]
fn length_is_min_of_appends_and_capacity() {
    for capacity in 1..=12 {
        for appends in 0..=30 {
            let mut dialogue = BoundedDialogue::empty(capacity);
            for i in 0..appends {
                dialogue.append(ROLES[i % ROLES.len()], format!("message {i}"));
                assert!(dialogue.len() <= capacity);
            }
            assert_eq!(dialogue.len(), appends.min(capacity), "cap {capacity}, {appends} appends");
        }
    }
}

#[test]
fn keeps_the_newest_messages_in_order() {
    for capacity in 1..=8 {
        let mut dialogue = BoundedDialogue::empty(capacity);
        let total = capacity * 3 + 1;
        for i in 0..total {
            dialogue.append(MessageRole::User, format!("{i}"));
        }
        let kept: Vec<usize> = dialogue
            .messages()
            .iter()
            .filter_map(|m| m.content.parse().ok())
            .collect();
        let expected: Vec<usize> = (total - capacity..total).collect();
        assert_eq!(kept, expected);
        assert_eq!(dialogue.last().map(|m| m.content.clone()), Some(format!("{}", total - 1)));
    }
}

#[test]
fn system_prompt_is_evicted_like_any_other_message() {
    let mut dialogue = BoundedDialogue::new(2, "You are an adventurer.");
    assert_eq!(dialogue.messages()[0].role, MessageRole::System);

    dialogue.append(MessageRole::User, "West of House");
    dialogue.append(MessageRole::Assistant, "open mailbox");

    let roles: Vec<MessageRole> = dialogue.messages().iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![MessageRole::User, MessageRole::Assistant]);
}
