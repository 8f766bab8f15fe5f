use std::collections::VecDeque;

use super::message::{Message, MessageContent, MessageRole};

/// 有界对话记录
///
/// 超出容量时按 FIFO 丢弃最旧的消息，最新追加的消息总是保留。
#[derive(Clone, Debug)]
pub struct BoundedDialogue {
    capacity: usize,
    messages: VecDeque<Message>,
}

impl BoundedDialogue {
    /// 容量为 0 时提升为 1，保证最新消息总会保留
    pub fn new(capacity: usize, system_prompt: impl Into<MessageContent>) -> Self {
        let mut dialogue = Self::empty(capacity);
        dialogue.push(Message::system(system_prompt));
        dialogue
    }

    pub fn empty(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            messages: VecDeque::with_capacity(capacity),
        }
    }

    pub fn append(&mut self, role: MessageRole, content: impl Into<MessageContent>) -> &mut Self {
        self.push(Message::new(role, content));
        self
    }

    pub fn push(&mut self, message: Message) -> &mut Self {
        while self.messages.len() >= self.capacity {
            self.messages.pop_front();
        }
        self.messages.push_back(message);
        self
    }

    pub fn messages(&self) -> &VecDeque<Message> {
        &self.messages
    }

    pub fn to_vec(&self) -> Vec<Message> {
        self.messages.iter().cloned().collect()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.back()
    }

    pub fn last_with_role(&self, role: MessageRole) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.role == role)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
