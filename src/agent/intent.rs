//! Intent schema validation.
//!
//! The model is asked to emit `{"action": "<tag>", "data": {...}}`. This
//! module turns that text into a typed [`Intent`] or a precise
//! [`IntentError`]. An action tag the agent does not know is not an error:
//! it yields [`ParsedIntent::Unrecognized`].

use serde_json::{Map, Value};

use crate::agent::units::TokenAmount;
use crate::chain::ChainRef;
use crate::error::IntentError;

/// A validated user intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    AddProxy {
        proxy_address: String,
    },
    /// Checked against the caller's own address.
    CheckProxy {
        proxy_address: String,
    },
    RemoveProxy {
        proxy_address: String,
    },
    XcmTransfer {
        source_chain: ChainRef,
        dest_chain: ChainRef,
        amount: TokenAmount,
    },
}

impl Intent {
    /// Canonical wire tag of this intent.
    pub fn action(&self) -> &'static str {
        match self {
            Self::AddProxy { .. } => ActionTag::AddProxy.as_str(),
            Self::CheckProxy { .. } => ActionTag::CheckProxy.as_str(),
            Self::RemoveProxy { .. } => ActionTag::RemoveProxy.as_str(),
            Self::XcmTransfer { .. } => ActionTag::XcmTransfer.as_str(),
        }
    }
}

/// Result of validating model output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedIntent {
    Valid(Intent),
    /// Well-formed object whose action tag is not supported.
    Unrecognized { action: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ActionTag {
    AddProxy,
    CheckProxy,
    RemoveProxy,
    XcmTransfer,
}

impl ActionTag {
    const ALL: [ActionTag; 4] = [
        Self::AddProxy,
        Self::CheckProxy,
        Self::RemoveProxy,
        Self::XcmTransfer,
    ];

    fn as_str(self) -> &'static str {
        match self {
            Self::AddProxy => "addProxy",
            Self::CheckProxy => "checkProxy",
            Self::RemoveProxy => "removeProxy",
            Self::XcmTransfer => "xcmTransfer",
        }
    }

    /// Match `addProxy`, `add_proxy`, `ADD-PROXY` and similar spellings.
    fn parse(raw: &str) -> Option<Self> {
        let wanted = normalize_tag(raw);
        Self::ALL
            .into_iter()
            .find(|tag| normalize_tag(tag.as_str()) == wanted)
    }
}

fn normalize_tag(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| !matches!(c, '_' | '-' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Remove a surrounding Markdown code fence (```json ... ```), if any.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. `json`) on the opening line.
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Parse raw model output into an intent.
pub fn parse_intent(raw: &str) -> Result<ParsedIntent, IntentError> {
    let value: Value = serde_json::from_str(strip_code_fence(raw))
        .map_err(|e| IntentError::InvalidJson(e.to_string()))?;

    let Value::Object(object) = value else {
        return Err(IntentError::WrongType {
            field: "intent",
            expected: "a JSON object",
        });
    };

    let action = match object.get("action") {
        None | Some(Value::Null) => return Err(IntentError::MissingField("action")),
        Some(Value::String(action)) => action,
        Some(_) => {
            return Err(IntentError::WrongType {
                field: "action",
                expected: "a string",
            });
        }
    };

    let Some(tag) = ActionTag::parse(action) else {
        return Ok(ParsedIntent::Unrecognized {
            action: action.clone(),
        });
    };

    let data = match object.get("data") {
        None | Some(Value::Null) => return Err(IntentError::MissingField("data")),
        Some(Value::Object(data)) => data,
        Some(_) => {
            return Err(IntentError::WrongType {
                field: "data",
                expected: "an object",
            });
        }
    };

    let intent = match tag {
        ActionTag::AddProxy => Intent::AddProxy {
            proxy_address: proxy_address(data)?,
        },
        ActionTag::CheckProxy => Intent::CheckProxy {
            proxy_address: proxy_address(data)?,
        },
        ActionTag::RemoveProxy => Intent::RemoveProxy {
            proxy_address: proxy_address(data)?,
        },
        ActionTag::XcmTransfer => {
            let source_chain = chain_field(data, "sourceChain")?;
            let dest_chain = chain_field(data, "destChain")?;
            if same_chain(&source_chain, &dest_chain) {
                return Err(IntentError::InvalidValue {
                    field: "destChain",
                    reason: format!("must differ from sourceChain ({})", source_chain),
                });
            }
            Intent::XcmTransfer {
                source_chain,
                dest_chain,
                amount: amount_field(data)?,
            }
        }
    };

    Ok(ParsedIntent::Valid(intent))
}

fn required<'a>(data: &'a Map<String, Value>, field: &'static str) -> Result<&'a Value, IntentError> {
    match data.get(field) {
        None | Some(Value::Null) => Err(IntentError::MissingField(field)),
        Some(value) => Ok(value),
    }
}

fn proxy_address(data: &Map<String, Value>) -> Result<String, IntentError> {
    const FIELD: &str = "proxyAddress";
    let Value::String(address) = required(data, FIELD)? else {
        return Err(IntentError::WrongType {
            field: FIELD,
            expected: "a string",
        });
    };
    let address = address.trim();
    if address.is_empty() {
        return Err(IntentError::InvalidValue {
            field: FIELD,
            reason: "address cannot be blank".to_string(),
        });
    }
    Ok(address.to_string())
}

fn chain_field(data: &Map<String, Value>, field: &'static str) -> Result<ChainRef, IntentError> {
    match required(data, field)? {
        Value::String(raw) => {
            ChainRef::parse(raw).map_err(|reason| IntentError::InvalidValue { field, reason })
        }
        Value::Number(n) => {
            let id = n
                .as_u64()
                .and_then(|id| u32::try_from(id).ok())
                .ok_or_else(|| IntentError::InvalidValue {
                    field,
                    reason: format!("'{}' is not a valid parachain id", n),
                })?;
            Ok(ChainRef::from_id(id))
        }
        _ => Err(IntentError::WrongType {
            field,
            expected: "a chain name or parachain id",
        }),
    }
}

fn same_chain(a: &ChainRef, b: &ChainRef) -> bool {
    match (a, b) {
        (ChainRef::Named(a), ChainRef::Named(b)) => a.eq_ignore_ascii_case(b),
        _ => a == b,
    }
}

fn amount_field(data: &Map<String, Value>) -> Result<TokenAmount, IntentError> {
    const FIELD: &str = "amount";
    let amount = match required(data, FIELD)? {
        // Number text is kept verbatim (`arbitrary_precision`), never via f64.
        Value::Number(n) => TokenAmount::parse(&n.to_string()),
        Value::String(raw) => TokenAmount::parse(raw),
        _ => {
            return Err(IntentError::WrongType {
                field: FIELD,
                expected: "a number or decimal string",
            });
        }
    }
    .map_err(|reason| IntentError::InvalidValue {
        field: FIELD,
        reason,
    })?;

    if amount.is_zero() {
        return Err(IntentError::InvalidValue {
            field: FIELD,
            reason: "amount must be greater than zero".to_string(),
        });
    }
    Ok(amount)
}
