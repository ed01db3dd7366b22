//! Protocol-Buffers message shapes exchanged over the frame transport
//! (spec.md §3 "Message", §6). Hand-declared against [`prost::Message`]
//! rather than generated from `.proto` files via `prost-build`/`protoc`,
//! so the crate stays buildable without a protobuf compiler on `PATH`
//! (mirrors how `other_examples/manifests/tokio-rs-prost` ships `prost`
//! as a plain runtime dependency).

use prost::Message;

// ---------------------------------------------------------------------
// Authentication (spec.md §4.3)
// ---------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Message)]
pub struct AuthenticateStart {
    #[prost(string, tag = "1")]
    pub mech_name: String,
    #[prost(bytes = "vec", optional, tag = "2")]
    pub auth_data: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "3")]
    pub initial_response: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Message)]
pub struct AuthenticateContinue {
    #[prost(bytes = "vec", tag = "1")]
    pub auth_data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Message)]
pub struct AuthenticateOk {
    #[prost(bytes = "vec", optional, tag = "1")]
    pub auth_data: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Message)]
pub struct AuthenticateFail {
    #[prost(string, tag = "1")]
    pub message: String,
}

// ---------------------------------------------------------------------
// Capabilities (spec.md §4.3 "TLS capability negotiation")
// ---------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Message)]
pub struct CapabilitiesGet {}

#[derive(Debug, Clone, PartialEq, Message)]
pub struct Capability {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(message, optional, tag = "2")]
    pub value: Option<Scalar>,
}

#[derive(Debug, Clone, PartialEq, Message)]
pub struct Capabilities {
    #[prost(message, repeated, tag = "1")]
    pub capabilities: Vec<Capability>,
}

#[derive(Debug, Clone, PartialEq, Message)]
pub struct CapabilitiesSet {
    #[prost(message, optional, tag = "1")]
    pub capabilities: Option<Capabilities>,
}

// ---------------------------------------------------------------------
// Session lifecycle
// ---------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Message)]
pub struct Close {}

#[derive(Debug, Clone, PartialEq, Message)]
pub struct Ok {
    #[prost(string, optional, tag = "1")]
    pub msg: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Message)]
pub struct ServerError {
    #[prost(uint32, tag = "1")]
    pub code: u32,
    #[prost(string, tag = "2")]
    pub sql_state: String,
    #[prost(string, tag = "3")]
    pub msg: String,
}

// ---------------------------------------------------------------------
// Notices (spec.md §4.2 "Notice dispatch")
// ---------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Message)]
pub struct Frame {
    #[prost(uint32, tag = "1")]
    pub notice_type: u32,
    #[prost(bytes = "vec", optional, tag = "2")]
    pub payload: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Message)]
pub struct Warning {
    #[prost(bool, optional, tag = "1")]
    pub is_note: Option<bool>,
    #[prost(uint32, tag = "2")]
    pub code: u32,
    #[prost(string, tag = "3")]
    pub msg: String,
}

#[derive(Debug, Clone, PartialEq, Message)]
pub struct SessionVariableChanged {
    #[prost(string, tag = "1")]
    pub param: String,
    #[prost(message, optional, tag = "2")]
    pub value: Option<Scalar>,
}

#[derive(Debug, Clone, PartialEq, Message)]
pub struct SessionStateChanged {
    #[prost(string, tag = "1")]
    pub param: String,
    #[prost(message, optional, tag = "2")]
    pub value: Option<Scalar>,
}

// ---------------------------------------------------------------------
// SQL / statement execution (spec.md §4.4 "Result state machine")
// ---------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Message)]
pub struct Any {
    #[prost(message, optional, tag = "1")]
    pub scalar: Option<Scalar>,
    #[prost(message, optional, tag = "2")]
    pub array: Option<ArrayValue>,
    #[prost(message, optional, tag = "3")]
    pub obj: Option<ObjectValue>,
}

#[derive(Debug, Clone, PartialEq, Message)]
pub struct StmtExecute {
    #[prost(string, optional, tag = "1")]
    pub namespace: Option<String>,
    #[prost(bytes = "vec", tag = "2")]
    pub stmt: Vec<u8>,
    #[prost(message, repeated, tag = "3")]
    pub args: Vec<Any>,
    #[prost(bool, optional, tag = "4")]
    pub compact_metadata: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Message)]
pub struct ColumnMetaData {
    #[prost(uint32, tag = "1")]
    pub col_type: u32,
    #[prost(string, optional, tag = "2")]
    pub name: Option<String>,
    #[prost(string, optional, tag = "3")]
    pub original_name: Option<String>,
    #[prost(string, optional, tag = "4")]
    pub table: Option<String>,
    #[prost(string, optional, tag = "5")]
    pub original_table: Option<String>,
    #[prost(string, optional, tag = "6")]
    pub schema: Option<String>,
    #[prost(string, optional, tag = "7")]
    pub catalog: Option<String>,
    #[prost(uint64, optional, tag = "8")]
    pub collation: Option<u64>,
    #[prost(uint32, optional, tag = "9")]
    pub fractional_digits: Option<u32>,
    #[prost(uint32, optional, tag = "10")]
    pub length: Option<u32>,
    #[prost(uint32, optional, tag = "11")]
    pub flags: Option<u32>,
    #[prost(uint32, optional, tag = "12")]
    pub content_type: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Message)]
pub struct Row {
    #[prost(bytes = "vec", repeated, tag = "1")]
    pub field: Vec<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Message)]
pub struct FetchDone {}

#[derive(Debug, Clone, PartialEq, Message)]
pub struct FetchDoneMoreResultsets {}

#[derive(Debug, Clone, PartialEq, Message)]
pub struct StmtExecuteOk {
    #[prost(uint64, optional, tag = "1")]
    pub last_insert_id: Option<u64>,
    #[prost(uint64, optional, tag = "2")]
    pub rows_affected: Option<u64>,
    #[prost(string, optional, tag = "3")]
    pub generated_document_id: Option<String>,
}

// ---------------------------------------------------------------------
// CRUD operations (spec.md §7 "CRUD/SQL builder pipeline")
// ---------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Message)]
pub struct Collection {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, optional, tag = "2")]
    pub schema: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ::prost::Enumeration)]
#[repr(i32)]
pub enum DataModel {
    Document = 0,
    Table = 1,
}

#[derive(Debug, Clone, PartialEq, Message)]
pub struct Order {
    #[prost(message, optional, tag = "1")]
    pub expr: Option<Expr>,
    #[prost(enumeration = "OrderDirection", optional, tag = "2")]
    pub direction: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ::prost::Enumeration)]
#[repr(i32)]
pub enum OrderDirection {
    Asc = 1,
    Desc = 2,
}

#[derive(Debug, Clone, PartialEq, Message)]
pub struct Projection {
    #[prost(message, optional, tag = "1")]
    pub source: Option<Expr>,
    #[prost(string, optional, tag = "2")]
    pub alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Message)]
pub struct Limit {
    #[prost(uint64, tag = "1")]
    pub row_count: u64,
    #[prost(uint64, optional, tag = "2")]
    pub offset: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Message)]
pub struct Find {
    #[prost(message, required, tag = "1")]
    pub collection: Collection,
    #[prost(enumeration = "DataModel", tag = "2")]
    pub data_model: i32,
    #[prost(message, repeated, tag = "3")]
    pub projection: Vec<Projection>,
    #[prost(message, optional, tag = "4")]
    pub criteria: Option<Expr>,
    #[prost(message, repeated, tag = "5")]
    pub grouping: Vec<Expr>,
    #[prost(message, optional, tag = "6")]
    pub grouping_criteria: Option<Expr>,
    #[prost(message, repeated, tag = "7")]
    pub order: Vec<Order>,
    #[prost(message, optional, tag = "8")]
    pub limit: Option<Limit>,
    #[prost(message, repeated, tag = "9")]
    pub args: Vec<Scalar>,
}

#[derive(Debug, Clone, PartialEq, Message)]
pub struct InsertTypedRow {
    #[prost(message, repeated, tag = "1")]
    pub field: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq, Message)]
pub struct Insert {
    #[prost(message, required, tag = "1")]
    pub collection: Collection,
    #[prost(enumeration = "DataModel", tag = "2")]
    pub data_model: i32,
    #[prost(message, repeated, tag = "3")]
    pub projection: Vec<ColumnIdentifier>,
    #[prost(message, repeated, tag = "4")]
    pub row: Vec<InsertTypedRow>,
}

#[derive(Debug, Clone, PartialEq, Message)]
pub struct UpdateOperation {
    #[prost(message, required, tag = "1")]
    pub source: ColumnIdentifier,
    #[prost(enumeration = "UpdateOperationKind", tag = "2")]
    pub operation: i32,
    #[prost(message, optional, tag = "3")]
    pub value: Option<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ::prost::Enumeration)]
#[repr(i32)]
pub enum UpdateOperationKind {
    Set = 1,
    ItemRemove = 2,
    ItemSet = 3,
    ItemReplace = 4,
    ItemMerge = 5,
    ArrayInsert = 6,
    ArrayAppend = 7,
}

#[derive(Debug, Clone, PartialEq, Message)]
pub struct Update {
    #[prost(message, required, tag = "1")]
    pub collection: Collection,
    #[prost(enumeration = "DataModel", tag = "2")]
    pub data_model: i32,
    #[prost(message, optional, tag = "3")]
    pub criteria: Option<Expr>,
    #[prost(message, repeated, tag = "4")]
    pub order: Vec<Order>,
    #[prost(message, optional, tag = "5")]
    pub limit: Option<Limit>,
    #[prost(message, repeated, tag = "6")]
    pub operation: Vec<UpdateOperation>,
    #[prost(message, repeated, tag = "7")]
    pub args: Vec<Scalar>,
}

#[derive(Debug, Clone, PartialEq, Message)]
pub struct Delete {
    #[prost(message, required, tag = "1")]
    pub collection: Collection,
    #[prost(enumeration = "DataModel", tag = "2")]
    pub data_model: i32,
    #[prost(message, optional, tag = "3")]
    pub criteria: Option<Expr>,
    #[prost(message, repeated, tag = "4")]
    pub order: Vec<Order>,
    #[prost(message, optional, tag = "5")]
    pub limit: Option<Limit>,
    #[prost(message, repeated, tag = "6")]
    pub args: Vec<Scalar>,
}

// ---------------------------------------------------------------------
// Expression tree ADT (spec.md §3 "Expression tree")
// ---------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Message)]
pub struct ColumnIdentifier {
    #[prost(string, repeated, tag = "1")]
    pub document_path: Vec<String>,
    #[prost(string, optional, tag = "2")]
    pub name: Option<String>,
    #[prost(string, optional, tag = "3")]
    pub table_name: Option<String>,
    #[prost(string, optional, tag = "4")]
    pub schema_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Message)]
pub struct FunctionCall {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(message, repeated, tag = "2")]
    pub param: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq, Message)]
pub struct Operator {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(message, repeated, tag = "2")]
    pub param: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq, Message)]
pub struct ArrayValue {
    #[prost(message, repeated, tag = "1")]
    pub value: Vec<Any>,
}

#[derive(Debug, Clone, PartialEq, Message)]
pub struct ObjectField {
    #[prost(string, tag = "1")]
    pub key: String,
    #[prost(message, optional, tag = "2")]
    pub value: Option<Any>,
}

#[derive(Debug, Clone, PartialEq, Message)]
pub struct ObjectValue {
    #[prost(message, repeated, tag = "1")]
    pub fld: Vec<ObjectField>,
}

#[derive(Debug, Clone, PartialEq, Message)]
pub struct Scalar {
    #[prost(oneof = "ScalarValue", tags = "1, 2, 3, 4, 5, 6")]
    pub value: Option<ScalarValue>,
}

#[derive(Debug, Clone, PartialEq, ::prost::Oneof)]
pub enum ScalarValue {
    #[prost(bool, tag = "1")]
    VBool(bool),
    #[prost(sint64, tag = "2")]
    VSignedInt(i64),
    #[prost(uint64, tag = "3")]
    VUnsignedInt(u64),
    #[prost(double, tag = "4")]
    VDouble(f64),
    #[prost(string, tag = "5")]
    VString(String),
    #[prost(bytes, tag = "6")]
    VOctets(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Message)]
pub struct Expr {
    #[prost(oneof = "ExprKind", tags = "1, 2, 3, 4, 5")]
    pub kind: Option<ExprKind>,
}

#[derive(Debug, Clone, PartialEq, ::prost::Oneof)]
pub enum ExprKind {
    #[prost(message, tag = "1")]
    Identifier(ColumnIdentifier),
    #[prost(message, tag = "2")]
    Literal(Scalar),
    #[prost(message, tag = "3")]
    FunctionCall(FunctionCall),
    #[prost(message, tag = "4")]
    Operator(Operator),
    #[prost(uint32, tag = "5")]
    Placeholder(u32),
}
