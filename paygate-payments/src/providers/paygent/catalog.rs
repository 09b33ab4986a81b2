//! Telegram catalog
//!
//! Each operation the adapter performs is one row: the numeric telegram kind
//! plus the request fields the provider requires or accepts and the response
//! fields a successful answer must carry. Requests are checked against the
//! row before they are encoded, responses after they are parsed.

/// Operations spoken over the telegram protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Authorize,
    AuthorizeSavedCard,
    AuthorizeCancel,
    Capture,
    SaleCancel,
    CompleteThreeDSecure,
    CreateSavedCard,
    DeleteSavedCard,
    GetSavedCard,
    ListSavedCards,
    AuthorizeChange,
    SaleChange,
    Query,
}

impl Operation {
    /// Catalog row for this operation
    pub fn spec(self) -> &'static TelegramSpec {
        match self {
            Self::Authorize => &AUTHORIZE,
            Self::AuthorizeSavedCard => &AUTHORIZE_SAVED_CARD,
            Self::AuthorizeCancel => &AUTHORIZE_CANCEL,
            Self::Capture => &CAPTURE,
            Self::SaleCancel => &SALE_CANCEL,
            Self::CompleteThreeDSecure => &COMPLETE_THREE_D_SECURE,
            Self::CreateSavedCard => &CREATE_SAVED_CARD,
            Self::DeleteSavedCard => &DELETE_SAVED_CARD,
            Self::GetSavedCard => &GET_SAVED_CARD,
            Self::ListSavedCards => &LIST_SAVED_CARDS,
            Self::AuthorizeChange => &AUTHORIZE_CHANGE,
            Self::SaleChange => &SALE_CHANGE,
            Self::Query => &QUERY,
        }
    }
}

/// One catalog row
#[derive(Debug)]
pub struct TelegramSpec {
    pub operation: Operation,
    /// Value of the `telegram_kind` field
    pub kind: &'static str,
    pub required: &'static [&'static str],
    pub optional: &'static [&'static str],
    /// Fields a `result=0` response must contain
    pub response: &'static [&'static str],
}

impl TelegramSpec {
    /// Whether the field may appear in a request of this kind
    pub fn accepts(&self, field: &str) -> bool {
        self.required.contains(&field) || self.optional.contains(&field)
    }
}

/// Sent on every request ahead of the operation fields
pub const CREDENTIAL_FIELDS: &[&str] = &[
    "merchant_id",
    "connect_id",
    "connect_password",
    "telegram_version",
    "telegram_kind",
];

const THREE_D_FIELDS_AND_CURRENCY: &[&str] = &[
    "currency_code",
    "3dsecure_ryaku",
    "http_user_agent",
    "http_accept",
    "term_url",
];

static AUTHORIZE: TelegramSpec = TelegramSpec {
    operation: Operation::Authorize,
    kind: "020",
    required: &[
        "trading_id",
        "payment_amount",
        "payment_class",
        "card_number",
        "card_valid_term",
    ],
    optional: &[
        "currency_code",
        "3dsecure_ryaku",
        "http_user_agent",
        "http_accept",
        "term_url",
        "cardholder_name",
        "card_conf_number",
        "security_code_use",
    ],
    response: &["payment_id"],
};

static AUTHORIZE_SAVED_CARD: TelegramSpec = TelegramSpec {
    operation: Operation::AuthorizeSavedCard,
    kind: "020",
    required: &[
        "trading_id",
        "payment_amount",
        "payment_class",
        "stock_card_mode",
        "customer_id",
        "customer_card_id",
    ],
    optional: THREE_D_FIELDS_AND_CURRENCY,
    response: &["payment_id"],
};

static AUTHORIZE_CANCEL: TelegramSpec = TelegramSpec {
    operation: Operation::AuthorizeCancel,
    kind: "021",
    required: &["payment_id"],
    optional: &["trading_id"],
    response: &[],
};

static CAPTURE: TelegramSpec = TelegramSpec {
    operation: Operation::Capture,
    kind: "022",
    required: &["payment_id"],
    optional: &["trading_id"],
    response: &[],
};

static SALE_CANCEL: TelegramSpec = TelegramSpec {
    operation: Operation::SaleCancel,
    kind: "023",
    required: &["payment_id"],
    optional: &["trading_id"],
    response: &[],
};

static COMPLETE_THREE_D_SECURE: TelegramSpec = TelegramSpec {
    operation: Operation::CompleteThreeDSecure,
    kind: "024",
    required: &["payment_id", "pares"],
    optional: &["md"],
    response: &["payment_id"],
};

static CREATE_SAVED_CARD: TelegramSpec = TelegramSpec {
    operation: Operation::CreateSavedCard,
    kind: "025",
    required: &["customer_id", "card_number", "card_valid_term"],
    optional: &["cardholder_name", "card_conf_number"],
    response: &["customer_card_id"],
};

static DELETE_SAVED_CARD: TelegramSpec = TelegramSpec {
    operation: Operation::DeleteSavedCard,
    kind: "026",
    required: &["customer_id", "customer_card_id"],
    optional: &[],
    response: &[],
};

static GET_SAVED_CARD: TelegramSpec = TelegramSpec {
    operation: Operation::GetSavedCard,
    kind: "027",
    required: &["customer_id", "customer_card_id"],
    optional: &[],
    response: &[],
};

static LIST_SAVED_CARDS: TelegramSpec = TelegramSpec {
    operation: Operation::ListSavedCards,
    kind: "027",
    required: &["customer_id"],
    optional: &[],
    response: &[],
};

static AUTHORIZE_CHANGE: TelegramSpec = TelegramSpec {
    operation: Operation::AuthorizeChange,
    kind: "028",
    required: &["payment_id", "payment_amount"],
    optional: &[],
    response: &[],
};

static SALE_CHANGE: TelegramSpec = TelegramSpec {
    operation: Operation::SaleChange,
    kind: "029",
    required: &["payment_id", "payment_amount"],
    optional: &[],
    response: &[],
};

static QUERY: TelegramSpec = TelegramSpec {
    operation: Operation::Query,
    kind: "094",
    required: &["payment_id"],
    optional: &[],
    response: &["payment_status"],
};

/// Every row, for inspection
pub static CATALOG: [&TelegramSpec; 13] = [
    &AUTHORIZE,
    &AUTHORIZE_SAVED_CARD,
    &AUTHORIZE_CANCEL,
    &CAPTURE,
    &SALE_CANCEL,
    &COMPLETE_THREE_D_SECURE,
    &CREATE_SAVED_CARD,
    &DELETE_SAVED_CARD,
    &GET_SAVED_CARD,
    &LIST_SAVED_CARDS,
    &AUTHORIZE_CHANGE,
    &SALE_CHANGE,
    &QUERY,
];
