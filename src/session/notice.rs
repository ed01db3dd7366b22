//! Notice dispatch (spec.md §4.2 "Notice dispatch"). Notices never advance
//! [`crate::result::Result`] state; they are applied as a side effect while
//! the result state machine waits for its next substantive frame.

use crate::constant::{NoticeType, SESSION_STATE_ACCOUNT_EXPIRED};
use crate::error::{Error, Result as CrateResult};
use crate::proto::messages as m;
use prost::Message as _;

/// One entry of `Result::warnings` (spec.md §3 "Result").
#[derive(Debug, Clone, PartialEq)]
pub struct Warning {
    pub level: WarningLevel,
    pub code: u32,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningLevel {
    Note,
    Warning,
    Error,
}

/// What a notice did, so the caller (the result state machine or the
/// session) can apply it without re-decoding the frame.
pub enum NoticeEffect {
    Warning(Warning),
    AccountExpired,
    SessionVariableChanged { param: String },
    /// A notice type this session recognizes but takes no builtin action
    /// on; forwarded to the optional user handler (spec.md §4.2).
    Unhandled(m::Frame),
}

pub fn interpret(frame: m::Frame) -> CrateResult<NoticeEffect> {
    let kind = NoticeType::from_u32(frame.notice_type).ok_or_else(|| Error::Malformed(
        format!("unknown notice type {}", frame.notice_type),
    ))?;
    let payload = frame.payload.clone().unwrap_or_default();

    match kind {
        NoticeType::Warning => {
            let w: m::Warning = m::Warning::decode(payload.as_slice())
                .map_err(|e| Error::Malformed(format!("undecodable warning notice: {e}")))?;
            let level = if w.is_note.unwrap_or(false) {
                WarningLevel::Note
            } else {
                WarningLevel::Warning
            };
            Ok(NoticeEffect::Warning(Warning {
                level,
                code: w.code,
                text: w.msg,
            }))
        }
        NoticeType::SessionVariableChanged => {
            let v: m::SessionVariableChanged = m::SessionVariableChanged::decode(payload.as_slice())
                .map_err(|e| Error::Malformed(format!("undecodable session-variable-changed: {e}")))?;
            Ok(NoticeEffect::SessionVariableChanged { param: v.param })
        }
        NoticeType::SessionStateChanged => {
            let v: m::SessionStateChanged = m::SessionStateChanged::decode(payload.as_slice())
                .map_err(|e| Error::Malformed(format!("undecodable session-state-changed: {e}")))?;
            if v.param == SESSION_STATE_ACCOUNT_EXPIRED {
                Ok(NoticeEffect::AccountExpired)
            } else {
                Ok(NoticeEffect::Unhandled(m::Frame {
                    notice_type: frame.notice_type,
                    payload: Some(payload),
                }))
            }
        }
    }
}
