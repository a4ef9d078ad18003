//! Detects instructor answers worth learning from ordinary channel traffic.
//!
//! Three reply shapes carry a (question, answer) pair: a message containing
//! an archive link to the question followed by the answer text, a threaded
//! reply whose parent holds the question, and a shared message whose
//! attachment holds the question.

use crate::events::MessageEvent;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AnswerCapture {
    /// `<https://team.slack.com/archives/CHANNEL/pTS> answer text`
    LinkedMessage { channel: String, ts: String, answer: String },
    /// Reply inside a thread; the parent message is the question.
    ThreadReply { channel: String, parent_ts: String, answer: String },
    /// Shared message with attached text; the attachment is the question.
    SharedAttachment { question: String, answer: String },
}

pub fn detect(event: &MessageEvent) -> Option<AnswerCapture> {
    if let Some((channel, ts, answer)) = parse_message_link(&event.text) {
        return Some(AnswerCapture::LinkedMessage { channel, ts, answer });
    }

    if let Some(thread_ts) = &event.thread_ts {
        if thread_ts != &event.ts {
            return Some(AnswerCapture::ThreadReply {
                channel: event.channel_id.clone(),
                parent_ts: thread_ts.clone(),
                answer: event.text.clone(),
            });
        }
    }

    if let Some(attachment_text) = &event.attachment_text {
        if !attachment_text.is_empty() {
            return Some(AnswerCapture::SharedAttachment {
                question: attachment_text.clone(),
                answer: event.text.clone(),
            });
        }
    }

    None
}

/// Strips `<@U...>` mention tokens, along with the whitespace around them.
pub fn strip_mentions(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find("<@") {
        let Some(close) = rest[start..].find('>') else {
            break;
        };
        out.push_str(rest[..start].trim_end());
        rest = rest[start + close + 1..].trim_start();
    }
    out.push_str(rest);
    out.trim().to_owned()
}

/// Parses `<https://<team>.slack.com/archives/<channel>/p<digits>>` followed
/// by the answer. The archive permalink packs the message timestamp into a
/// run of digits; Slack's API wants the last six behind a dot.
fn parse_message_link(text: &str) -> Option<(String, String, String)> {
    let start = text.find("<https://")?;
    let close = text[start..].find('>')? + start;
    let url = &text[start + "<https://".len()..close];
    let answer = text[close + 1..].trim();
    if answer.is_empty() {
        return None;
    }

    let (host, path) = url.split_once('/')?;
    if !host.ends_with(".slack.com") {
        return None;
    }
    let path = path.strip_prefix("archives/")?;
    let (channel, ts_segment) = path.split_once('/')?;
    let digits = ts_segment.strip_prefix('p')?;
    if digits.len() <= 6 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let split = digits.len() - 6;
    let ts = format!("{}.{}", &digits[..split], &digits[split..]);
    Some((channel.to_owned(), ts, answer.to_owned()))
}
