//! Wire constants: message kind bytes (spec.md §3 "Message kind", §6 "Kind
//! bytes are partitioned into client-only and server-only ranges") and
//! capability names (spec.md §6, bit-exact).

/// Single-byte discriminant tagging a frame's payload schema (spec.md §2
/// GLOSSARY "Kind"). Client-bound and server-bound kinds occupy disjoint
/// ranges; crossing the partition is a protocol violation (§6).
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    // --- client -> server (0x00..0x7F) ---
    AuthenticateStart = 0x01,
    AuthenticateContinue = 0x02,
    CapabilitiesGet = 0x03,
    CapabilitiesSet = 0x04,
    Close = 0x05,
    SqlStmtExecute = 0x10,
    CrudFind = 0x11,
    CrudInsert = 0x12,
    CrudUpdate = 0x13,
    CrudDelete = 0x14,

    // --- server -> client (0x80..0xFF) ---
    Ok = 0x80,
    Error = 0x81,
    AuthenticateOk = 0x82,
    AuthenticateFail = 0x83,
    Capabilities = 0x84,
    NoticeFrame = 0x85,
    SqlColumnMetaData = 0x90,
    SqlRow = 0x91,
    SqlResultFetchDone = 0x92,
    SqlResultFetchDoneMoreResultsets = 0x93,
    SqlStmtExecuteOk = 0x94,
}

impl MessageKind {
    pub fn from_byte(byte: u8) -> Option<Self> {
        use MessageKind::*;
        Some(match byte {
            0x01 => AuthenticateStart,
            0x02 => AuthenticateContinue,
            0x03 => CapabilitiesGet,
            0x04 => CapabilitiesSet,
            0x05 => Close,
            0x10 => SqlStmtExecute,
            0x11 => CrudFind,
            0x12 => CrudInsert,
            0x13 => CrudUpdate,
            0x14 => CrudDelete,
            0x80 => Ok,
            0x81 => Error,
            0x82 => AuthenticateOk,
            0x83 => AuthenticateFail,
            0x84 => Capabilities,
            0x85 => NoticeFrame,
            0x90 => SqlColumnMetaData,
            0x91 => SqlRow,
            0x92 => SqlResultFetchDone,
            0x93 => SqlResultFetchDoneMoreResultsets,
            0x94 => SqlStmtExecuteOk,
            _ => return None,
        })
    }

    pub const fn is_server_bound(self) -> bool {
        (self as u8) < 0x80
    }

    pub const fn is_client_bound(self) -> bool {
        !self.is_server_bound()
    }
}

/// `"client.pwd_expire_ok"` — the core sets this to `true` during connect
/// (spec.md §4.3, §6, bit-exact).
pub const CAPABILITY_PWD_EXPIRE_OK: &str = "client.pwd_expire_ok";

/// TLS capabilities live under the `"tls"` namespace (spec.md §6).
pub const CAPABILITY_TLS: &str = "tls";

/// Bit-exact bootstrap query issued once authentication completes without an
/// expired password (spec.md §4.3, §6).
pub const BOOTSTRAP_QUERY: &str = "select @@lower_case_table_names, @@version, connection_id(), \
variable_value from performance_schema.session_status \
where variable_name = 'mysqlx_ssl_cipher'";

/// Maximum frame payload length, an implementation-defined safety cap
/// (spec.md §3 Frame invariant).
pub const MAX_FRAME_LENGTH: u32 = 16 * 1024 * 1024;

/// Notice type discriminants (spec.md §4.2 "Notice dispatch").
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeType {
    Warning = 1,
    SessionVariableChanged = 2,
    SessionStateChanged = 3,
}

impl NoticeType {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            1 => Some(Self::Warning),
            2 => Some(Self::SessionVariableChanged),
            3 => Some(Self::SessionStateChanged),
            _ => None,
        }
    }
}

/// `session-state-changed` parameter name that marks a recoverable
/// expired-password signal (spec.md §4.2, §4.3).
pub const SESSION_STATE_ACCOUNT_EXPIRED: &str = "account-expired";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_byte_partition_matches_bound_classification() {
        for byte in 0u8..=0xFF {
            if let Some(kind) = MessageKind::from_byte(byte) {
                assert_eq!(kind.is_server_bound(), byte < 0x80);
                assert_eq!(kind as u8, byte);
            }
        }
    }

    #[test]
    fn bootstrap_query_is_bit_exact() {
        assert!(BOOTSTRAP_QUERY.contains("performance_schema.session_status"));
        assert!(BOOTSTRAP_QUERY.contains("'mysqlx_ssl_cipher'"));
    }
}
