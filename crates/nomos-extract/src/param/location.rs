//! Per-location decoders.
//!
//! Each location knows where its raw text lives and which prefix and
//! delimiters a style uses:
//!
//! | location | style | explode | prefix | items | object pairs |
//! |---|---|---|---|---|---|
//! | path | simple | any | | `,` | `,` / `=` |
//! | path | label | false / true | `.` | `,` / `.` | `,` / `=` |
//! | path | matrix | false / true | `;name=` / `;` | `,` / `;name=` | `,` / `=` |
//! | query | form | false / true | | `,` / repeated key | `,` / key per property |
//! | query | spaceDelimited | false | | ` ` | |
//! | query | pipeDelimited | false | | `\|` | |
//! | query | deepObject | true | | bracketed keys | |
//! | header | simple | any | | `,` | `,` / `=` |
//! | cookie | form | false | | `,` | `,` |

use nomos_core::{DocumentError, Parameter, SerializationMethod, Schema, Style};
use nomos_schema::SchemaValidator;

use super::deep_object;
use super::primitive::{
    cut_prefix, make_object, parse_array, parse_primitive, percent_decode, property_names,
    props_from_string,
};
use super::Decoded;
use crate::context::ParameterContext;
use crate::error::DecodeError;

/// Decodes the three value shapes from one location.
pub(crate) trait ValueDecoder {
    fn validator(&self) -> &SchemaValidator;

    fn decode_primitive(
        &self,
        param: &Parameter,
        method: SerializationMethod,
        schema: &Schema,
    ) -> Result<Decoded, DecodeError>;

    fn decode_array(
        &self,
        param: &Parameter,
        method: SerializationMethod,
        schema: &Schema,
    ) -> Result<Decoded, DecodeError>;

    fn decode_object(
        &self,
        param: &Parameter,
        method: SerializationMethod,
        schema: &Schema,
    ) -> Result<Decoded, DecodeError>;
}

fn unsupported(param: &Parameter, method: SerializationMethod) -> DecodeError {
    DecodeError::Document(DocumentError::InvalidSerialization {
        name: param.name.clone(),
        location: param.location,
        style: method.style,
        explode: method.explode,
    })
}

fn split(src: &str, delim: &str) -> Vec<String> {
    src.split(delim).map(str::to_string).collect()
}

fn array(items: &[String], schema: &Schema, validator: &SchemaValidator) -> Result<Decoded, DecodeError> {
    Ok(Decoded::present(parse_array(items, schema, validator)?))
}

fn object(
    src: &str,
    prop_delim: char,
    value_delim: char,
    schema: &Schema,
    validator: &SchemaValidator,
) -> Result<Decoded, DecodeError> {
    if src.is_empty() {
        return Ok(Decoded::Empty);
    }
    let props = props_from_string(src, prop_delim, value_delim)?;
    Ok(Decoded::Value(make_object(props, schema, validator)?))
}

/// Path parameters, still percent-encoded as the router saw them.
pub(crate) struct PathDecoder<'c, 'a> {
    pub(crate) ctx: &'c ParameterContext<'a>,
    pub(crate) validator: &'c SchemaValidator,
}

impl ValueDecoder for PathDecoder<'_, '_> {
    fn validator(&self) -> &SchemaValidator {
        self.validator
    }

    fn decode_primitive(
        &self,
        param: &Parameter,
        method: SerializationMethod,
        schema: &Schema,
    ) -> Result<Decoded, DecodeError> {
        let Some(raw) = self.ctx.path_param(&param.name) else {
            return Ok(Decoded::Absent);
        };
        let prefix = format!(";{}=", param.name);
        let raw = match method.style {
            Style::Simple => raw,
            Style::Label => cut_prefix(raw, ".")?,
            Style::Matrix => cut_prefix(raw, &prefix)?,
            _ => return Err(unsupported(param, method)),
        };
        let raw = percent_decode(raw)?;
        Ok(Decoded::present(parse_primitive(&raw, schema, self.validator)?))
    }

    fn decode_array(
        &self,
        param: &Parameter,
        method: SerializationMethod,
        schema: &Schema,
    ) -> Result<Decoded, DecodeError> {
        let Some(raw) = self.ctx.path_param(&param.name) else {
            return Ok(Decoded::Absent);
        };
        let prefix = format!(";{}=", param.name);
        let (src, delim) = match (method.style, method.explode) {
            (Style::Simple, _) => (raw, ","),
            (Style::Label, false) => (cut_prefix(raw, ".")?, ","),
            (Style::Label, true) => (cut_prefix(raw, ".")?, "."),
            (Style::Matrix, false) => (cut_prefix(raw, &prefix)?, ","),
            (Style::Matrix, true) => (cut_prefix(raw, &prefix)?, prefix.as_str()),
            _ => return Err(unsupported(param, method)),
        };
        if src.is_empty() {
            return Ok(Decoded::Empty);
        }
        let items = src
            .split(delim)
            .map(percent_decode)
            .collect::<Result<Vec<_>, _>>()?;
        array(&items, schema, self.validator)
    }

    fn decode_object(
        &self,
        param: &Parameter,
        method: SerializationMethod,
        schema: &Schema,
    ) -> Result<Decoded, DecodeError> {
        let Some(raw) = self.ctx.path_param(&param.name) else {
            return Ok(Decoded::Absent);
        };
        let prefix = format!(";{}=", param.name);
        let (src, prop_delim, value_delim) = match (method.style, method.explode) {
            (Style::Simple, false) => (raw, ',', ','),
            (Style::Simple, true) => (raw, ',', '='),
            (Style::Label, false) => (cut_prefix(raw, ".")?, ',', ','),
            (Style::Label, true) => (cut_prefix(raw, ".")?, '.', '='),
            (Style::Matrix, false) => (cut_prefix(raw, &prefix)?, ',', ','),
            (Style::Matrix, true) => (cut_prefix(raw, ";")?, ';', '='),
            _ => return Err(unsupported(param, method)),
        };
        if src.is_empty() {
            return Ok(Decoded::Empty);
        }
        let props = props_from_string(src, prop_delim, value_delim)?
            .into_iter()
            .map(|(name, value)| Ok((percent_decode(&name)?, percent_decode(&value)?)))
            .collect::<Result<Vec<_>, nomos_core::ParseError>>()?;
        Ok(Decoded::Value(make_object(props, schema, self.validator)?))
    }
}

/// Query parameters, already percent-decoded.
pub(crate) struct QueryDecoder<'c, 'a> {
    pub(crate) ctx: &'c ParameterContext<'a>,
    pub(crate) validator: &'c SchemaValidator,
}

impl ValueDecoder for QueryDecoder<'_, '_> {
    fn validator(&self) -> &SchemaValidator {
        self.validator
    }

    fn decode_primitive(
        &self,
        param: &Parameter,
        method: SerializationMethod,
        schema: &Schema,
    ) -> Result<Decoded, DecodeError> {
        if method.style == Style::DeepObject {
            return Err(unsupported(param, method));
        }
        match self.ctx.query_values(&param.name).first() {
            Some(raw) => Ok(Decoded::present(parse_primitive(raw, schema, self.validator)?)),
            None => Ok(Decoded::Absent),
        }
    }

    fn decode_array(
        &self,
        param: &Parameter,
        method: SerializationMethod,
        schema: &Schema,
    ) -> Result<Decoded, DecodeError> {
        let values = self.ctx.query_values(&param.name);
        let Some(first) = values.first() else {
            return Ok(Decoded::Absent);
        };
        let items = match (method.style, method.explode) {
            (Style::Form, true) => values.iter().map(|value| (*value).to_string()).collect(),
            (Style::Form, false) => split(first, ","),
            (Style::SpaceDelimited, false) => split(first, " "),
            (Style::PipeDelimited, false) => split(first, "|"),
            _ => return Err(unsupported(param, method)),
        };
        array(&items, schema, self.validator)
    }

    fn decode_object(
        &self,
        param: &Parameter,
        method: SerializationMethod,
        schema: &Schema,
    ) -> Result<Decoded, DecodeError> {
        match (method.style, method.explode) {
            (Style::Form, true) => {
                let props: Vec<(String, String)> = property_names(schema)
                    .into_iter()
                    .filter_map(|name| {
                        let values = self.ctx.query_values(name);
                        (!values.is_empty()).then(|| (name.to_string(), values.join(",")))
                    })
                    .collect();
                if props.is_empty() {
                    return Ok(Decoded::Absent);
                }
                Ok(Decoded::Value(make_object(props, schema, self.validator)?))
            }
            (Style::Form, false) => match self.ctx.query_values(&param.name).first() {
                Some(raw) => object(raw, ',', ',', schema, self.validator),
                None => Ok(Decoded::Absent),
            },
            (Style::DeepObject, true) => Ok(deep_object::decode(
                &param.name,
                self.ctx.query_pairs(),
                schema,
                self.validator,
            )?),
            _ => Err(unsupported(param, method)),
        }
    }
}

/// Header parameters, `simple` style only.
pub(crate) struct HeaderDecoder<'c, 'a> {
    pub(crate) ctx: &'c ParameterContext<'a>,
    pub(crate) validator: &'c SchemaValidator,
}

impl HeaderDecoder<'_, '_> {
    fn raw(&self, param: &Parameter, method: SerializationMethod) -> Result<Option<String>, DecodeError> {
        if method.style != Style::Simple {
            return Err(unsupported(param, method));
        }
        Ok(self.ctx.header(&param.name).map(|raw| raw.trim().to_string()))
    }
}

impl ValueDecoder for HeaderDecoder<'_, '_> {
    fn validator(&self) -> &SchemaValidator {
        self.validator
    }

    fn decode_primitive(
        &self,
        param: &Parameter,
        method: SerializationMethod,
        schema: &Schema,
    ) -> Result<Decoded, DecodeError> {
        match self.raw(param, method)? {
            Some(raw) => Ok(Decoded::present(parse_primitive(&raw, schema, self.validator)?)),
            None => Ok(Decoded::Absent),
        }
    }

    fn decode_array(
        &self,
        param: &Parameter,
        method: SerializationMethod,
        schema: &Schema,
    ) -> Result<Decoded, DecodeError> {
        let Some(raw) = self.raw(param, method)? else {
            return Ok(Decoded::Absent);
        };
        let items: Vec<String> = raw.split(',').map(|item| item.trim().to_string()).collect();
        array(&items, schema, self.validator)
    }

    fn decode_object(
        &self,
        param: &Parameter,
        method: SerializationMethod,
        schema: &Schema,
    ) -> Result<Decoded, DecodeError> {
        let Some(raw) = self.raw(param, method)? else {
            return Ok(Decoded::Absent);
        };
        let value_delim = if method.explode { '=' } else { ',' };
        object(&raw.replace(", ", ","), ',', value_delim, schema, self.validator)
    }
}

/// Cookie parameters, `form` style only.
pub(crate) struct CookieDecoder<'c, 'a> {
    pub(crate) ctx: &'c ParameterContext<'a>,
    pub(crate) validator: &'c SchemaValidator,
}

impl CookieDecoder<'_, '_> {
    fn raw(&self, param: &Parameter, method: SerializationMethod) -> Result<Option<&str>, DecodeError> {
        if method.style != Style::Form {
            return Err(unsupported(param, method));
        }
        Ok(self.ctx.cookie(&param.name))
    }
}

impl ValueDecoder for CookieDecoder<'_, '_> {
    fn validator(&self) -> &SchemaValidator {
        self.validator
    }

    fn decode_primitive(
        &self,
        param: &Parameter,
        method: SerializationMethod,
        schema: &Schema,
    ) -> Result<Decoded, DecodeError> {
        match self.raw(param, method)? {
            Some(raw) => Ok(Decoded::present(parse_primitive(raw, schema, self.validator)?)),
            None => Ok(Decoded::Absent),
        }
    }

    fn decode_array(
        &self,
        param: &Parameter,
        method: SerializationMethod,
        schema: &Schema,
    ) -> Result<Decoded, DecodeError> {
        if method.explode {
            return Err(unsupported(param, method));
        }
        match self.raw(param, method)? {
            Some(raw) => array(&split(raw, ","), schema, self.validator),
            None => Ok(Decoded::Absent),
        }
    }

    fn decode_object(
        &self,
        param: &Parameter,
        method: SerializationMethod,
        schema: &Schema,
    ) -> Result<Decoded, DecodeError> {
        if method.explode {
            return Err(unsupported(param, method));
        }
        match self.raw(param, method)? {
            Some(raw) => object(raw, ',', ',', schema, self.validator),
            None => Ok(Decoded::Absent),
        }
    }
}
