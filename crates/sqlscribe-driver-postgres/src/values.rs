//! Conversion between sqlscribe values and PostgreSQL wire types

use bytes::BytesMut;
use sqlscribe_core::Value;
use tokio_postgres::Row as PgRow;
use tokio_postgres::types::{FromSql, IsNull, ToSql, Type};

type BoxError = Box<dyn std::error::Error + Sync + Send>;

/// Owned parameter value that implements `ToSql`.
/// tokio-postgres needs owned values whose width matches the statement's parameter types.
#[derive(Debug)]
pub(crate) enum PgValue {
    Null,
    Bool(bool),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    String(String),
    Bytes(Vec<u8>),
    Uuid(uuid::Uuid),
    Json(serde_json::Value),
    Date(chrono::NaiveDate),
    Time(chrono::NaiveTime),
    DateTime(chrono::NaiveDateTime),
    DateTimeUtc(chrono::DateTime<chrono::Utc>),
    /// Bound to `text[]` parameters such as `= ANY($2)`
    TextArray(Vec<String>),
}

impl PgValue {
    /// Convert a value, narrowing integers and floats to the prepared parameter type
    pub(crate) fn for_param(value: &Value, target_type: Option<&Type>) -> Self {
        match value {
            Value::Null => PgValue::Null,
            Value::Bool(v) => PgValue::Bool(*v),
            Value::Int16(v) => Self::coerce_int(*v as i64, target_type),
            Value::Int32(v) => Self::coerce_int(*v as i64, target_type),
            Value::Int64(v) => Self::coerce_int(*v, target_type),
            Value::Float32(v) => match target_type {
                Some(&Type::FLOAT8) => PgValue::Float64(*v as f64),
                _ => PgValue::Float32(*v),
            },
            Value::Float64(v) => match target_type {
                Some(&Type::FLOAT4) => PgValue::Float32(*v as f32),
                _ => PgValue::Float64(*v),
            },
            Value::Decimal(v) | Value::String(v) => PgValue::String(v.clone()),
            Value::Bytes(v) => PgValue::Bytes(v.clone()),
            Value::Uuid(v) => PgValue::Uuid(*v),
            Value::Json(v) => PgValue::Json(v.clone()),
            Value::Date(v) => PgValue::Date(*v),
            Value::Time(v) => PgValue::Time(*v),
            Value::DateTime(v) => PgValue::DateTime(*v),
            Value::DateTimeUtc(v) => PgValue::DateTimeUtc(*v),
            Value::Array(items) => {
                PgValue::TextArray(items.iter().map(|item| item.to_string()).collect())
            }
        }
    }

    fn coerce_int(value: i64, target_type: Option<&Type>) -> Self {
        match target_type {
            Some(&Type::INT2) => PgValue::Int16(value as i16),
            Some(&Type::INT4) => PgValue::Int32(value as i32),
            _ => PgValue::Int64(value),
        }
    }
}

impl ToSql for PgValue {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        match self {
            PgValue::Null => Ok(IsNull::Yes),
            PgValue::Bool(v) => v.to_sql(ty, out),
            PgValue::Int16(v) => v.to_sql(ty, out),
            PgValue::Int32(v) => v.to_sql(ty, out),
            PgValue::Int64(v) => v.to_sql(ty, out),
            PgValue::Float32(v) => v.to_sql(ty, out),
            PgValue::Float64(v) => v.to_sql(ty, out),
            PgValue::String(v) => v.to_sql(ty, out),
            PgValue::Bytes(v) => v.to_sql(ty, out),
            PgValue::Uuid(v) => v.to_sql(ty, out),
            PgValue::Json(v) => v.to_sql(ty, out),
            PgValue::Date(v) => v.to_sql(ty, out),
            PgValue::Time(v) => v.to_sql(ty, out),
            PgValue::DateTime(v) => v.to_sql(ty, out),
            PgValue::DateTimeUtc(v) => v.to_sql(ty, out),
            PgValue::TextArray(v) => v.to_sql(ty, out),
        }
    }

    fn accepts(_: &Type) -> bool {
        true
    }

    postgres_types::to_sql_checked!();
}

/// A cell in the text form PostgreSQL would print for it.
///
/// Binary layouts with no native Rust counterpart here are decoded by hand;
/// anything else must already be UTF-8 text (enums, citext, domains over text).
#[derive(Debug)]
struct TextForm(String);

impl<'a> FromSql<'a> for TextForm {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        let text = if *ty == Type::NUMERIC {
            decode_numeric(raw)?
        } else if *ty == Type::INTERVAL {
            decode_interval(raw)?
        } else if *ty == Type::MONEY {
            decode_money(raw)?
        } else if *ty == Type::INET || *ty == Type::CIDR {
            decode_inet(raw)?
        } else if *ty == Type::MACADDR {
            decode_macaddr(raw)?
        } else {
            std::str::from_utf8(raw)?.to_string()
        };
        Ok(Self(text))
    }

    fn accepts(_: &Type) -> bool {
        true
    }
}

fn fixed<const N: usize>(raw: &[u8], what: &str) -> Result<[u8; N], BoxError> {
    raw.try_into()
        .map_err(|_| format!("invalid {what} payload: expected {N} bytes, got {}", raw.len()).into())
}

fn plural(count: i64, unit: &str) -> String {
    if count == 1 || count == -1 {
        format!("{count} {unit}")
    } else {
        format!("{count} {unit}s")
    }
}

/// Decode INTERVAL: microseconds (i64), days (i32), months (i32), printed
/// the way the server's default `postgres` interval style does.
pub(crate) fn decode_interval(raw: &[u8]) -> Result<String, BoxError> {
    let raw: [u8; 16] = fixed(raw, "INTERVAL")?;
    let micros = i64::from_be_bytes([raw[0], raw[1], raw[2], raw[3], raw[4], raw[5], raw[6], raw[7]]);
    let days = i32::from_be_bytes([raw[8], raw[9], raw[10], raw[11]]) as i64;
    let months = i32::from_be_bytes([raw[12], raw[13], raw[14], raw[15]]) as i64;

    let mut parts = Vec::new();
    if months / 12 != 0 {
        parts.push(plural(months / 12, "year"));
    }
    if months % 12 != 0 {
        parts.push(plural(months % 12, "mon"));
    }
    if days != 0 {
        parts.push(plural(days, "day"));
    }
    if micros != 0 || parts.is_empty() {
        let sign = if micros < 0 { "-" } else { "" };
        let total = micros.unsigned_abs();
        let seconds = total / 1_000_000;
        let mut clock = format!(
            "{sign}{:02}:{:02}:{:02}",
            seconds / 3600,
            seconds % 3600 / 60,
            seconds % 60
        );
        let fraction = total % 1_000_000;
        if fraction != 0 {
            clock.push_str(format!(".{fraction:06}").trim_end_matches('0'));
        }
        parts.push(clock);
    }
    Ok(parts.join(" "))
}

/// Decode MONEY: an i64 count of cents. The currency symbol is locale-specific and omitted.
pub(crate) fn decode_money(raw: &[u8]) -> Result<String, BoxError> {
    let cents = i64::from_be_bytes(fixed(raw, "MONEY")?);
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    Ok(format!("{sign}{}.{:02}", cents / 100, cents % 100))
}

/// Decode INET/CIDR: family, prefix bits, cidr flag, address length, address bytes
pub(crate) fn decode_inet(raw: &[u8]) -> Result<String, BoxError> {
    let [family, bits, is_cidr, len, address @ ..] = raw else {
        return Err("invalid INET payload: too short".into());
    };
    if address.len() != *len as usize {
        return Err("invalid INET payload: address length mismatch".into());
    }
    let (text, max_bits) = match family {
        2 => (std::net::Ipv4Addr::from(fixed::<4>(address, "INET")?).to_string(), 32),
        3 => (std::net::Ipv6Addr::from(fixed::<16>(address, "INET")?).to_string(), 128),
        other => return Err(format!("invalid INET payload: unknown family {other}").into()),
    };
    if *is_cidr != 0 || *bits != max_bits {
        Ok(format!("{text}/{bits}"))
    } else {
        Ok(text)
    }
}

pub(crate) fn decode_macaddr(raw: &[u8]) -> Result<String, BoxError> {
    let bytes: [u8; 6] = fixed(raw, "MACADDR")?;
    Ok(bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(":"))
}

/// Decode the binary NUMERIC representation: a header of four big-endian
/// 16-bit words (digit count, weight, sign, display scale) followed by
/// base-10000 digit groups.
pub(crate) fn decode_numeric(raw: &[u8]) -> Result<String, BoxError> {
    if raw.len() < 8 {
        return Err("invalid NUMERIC payload: too short".into());
    }
    let word = |offset: usize| u16::from_be_bytes([raw[offset], raw[offset + 1]]);

    let ndigits = word(0) as usize;
    let weight = word(2) as i16 as i32;
    let sign = word(4);
    let dscale = word(6) as usize;

    match sign {
        0xC000 => return Ok("NaN".to_string()),
        0xD000 => return Ok("Infinity".to_string()),
        0xF000 => return Ok("-Infinity".to_string()),
        _ => {}
    }
    if raw.len() < 8 + ndigits * 2 {
        return Err("invalid NUMERIC payload: truncated digits".into());
    }

    let groups: Vec<u16> = (0..ndigits).map(|i| word(8 + i * 2)).collect();
    let group_at = |index: i32| -> u16 {
        usize::try_from(index)
            .ok()
            .and_then(|i| groups.get(i).copied())
            .unwrap_or(0)
    };

    let mut integer = String::new();
    for index in 0..=weight {
        if integer.is_empty() {
            integer.push_str(&group_at(index).to_string());
        } else {
            integer.push_str(&format!("{:04}", group_at(index)));
        }
    }
    if integer.is_empty() {
        integer.push('0');
    }

    let mut fraction = String::new();
    let fraction_groups = dscale.div_ceil(4) as i32;
    for offset in 0..fraction_groups {
        fraction.push_str(&format!("{:04}", group_at(weight + 1 + offset)));
    }
    fraction.truncate(dscale);

    let is_zero = groups.iter().all(|g| *g == 0);
    let mut text = String::new();
    if sign == 0x4000 && !is_zero {
        text.push('-');
    }
    text.push_str(&integer);
    if !fraction.is_empty() {
        text.push('.');
        text.push_str(&fraction);
    }
    Ok(text)
}

fn get<'a, T: FromSql<'a>>(row: &'a PgRow, idx: usize) -> Option<T> {
    row.try_get::<_, Option<T>>(idx).ok().flatten()
}

fn array<'a, T: FromSql<'a>>(row: &'a PgRow, idx: usize, wrap: fn(T) -> Value) -> Option<Value> {
    get::<Vec<T>>(row, idx).map(|items| Value::Array(items.into_iter().map(wrap).collect()))
}

/// Decode one result cell by PostgreSQL type name.
/// A cell of a type with no text form becomes a `<type>` placeholder, never `Null`.
pub(crate) fn postgres_to_value(row: &PgRow, idx: usize) -> Value {
    let type_name = row.columns()[idx].type_().name();

    let value = match type_name {
        "bool" => get(row, idx).map(Value::Bool),
        "int2" => get(row, idx).map(Value::Int16),
        "int4" => get(row, idx).map(Value::Int32),
        "int8" => get(row, idx).map(Value::Int64),
        "oid" => get::<u32>(row, idx).map(|v| Value::Int64(v as i64)),
        "float4" => get(row, idx).map(Value::Float32),
        "float8" => get(row, idx).map(Value::Float64),
        "numeric" => get::<TextForm>(row, idx).map(|n| Value::Decimal(n.0)),
        "text" | "varchar" | "bpchar" | "name" => get(row, idx).map(Value::String),
        "char" => get::<i8>(row, idx).map(|v| Value::String(char::from(v as u8).to_string())),
        "bytea" => get(row, idx).map(Value::Bytes),
        "uuid" => get(row, idx).map(Value::Uuid),
        "json" | "jsonb" => get(row, idx).map(Value::Json),
        "date" => get(row, idx).map(Value::Date),
        "time" => get(row, idx).map(Value::Time),
        "timestamp" => get(row, idx).map(Value::DateTime),
        "timestamptz" => get(row, idx).map(Value::DateTimeUtc),
        "_text" | "_varchar" | "_bpchar" | "_name" => array(row, idx, Value::String),
        "_int2" => array(row, idx, Value::Int16),
        "_int4" => array(row, idx, Value::Int32),
        "_int8" => array(row, idx, Value::Int64),
        "_bool" => array(row, idx, Value::Bool),
        _ => Some(match row.try_get::<_, Option<TextForm>>(idx) {
            Ok(Some(text)) => Value::String(text.0),
            Ok(None) => Value::Null,
            Err(e) => {
                tracing::debug!(column = idx, type_name, error = %e, "cell has no text form");
                Value::String(format!("<{type_name}>"))
            }
        }),
    };

    value.unwrap_or(Value::Null)
}
