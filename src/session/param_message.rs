//! Structure used to pass commands to the engine from the host U/X
use num::FromPrimitive;
use serde_json::json;
use simple_error::bail;
use std::fmt;

use crate::common::box_error::BoxError;

/// Commands the engine understands.  The numeric values are the wire codes
/// the host U/X sends in its json messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum EngineParam {
    StartSession = 100,
    StopSession = 101,
    ResetSession = 102,
    SetAlgorithm = 103,
    SetMicSmoothing = 104,
    SetRefSmoothing = 105,
    SetAnalysisInterval = 106,
    GetScore = 107,
}

pub struct ParamMessage {
    pub param: EngineParam,
    pub ivalue: i64,
    pub fvalue: f64,
    pub svalue: String,
}

impl ParamMessage {
    pub fn new(param: EngineParam, ival: i64, fval: f64, sval: &str) -> ParamMessage {
        ParamMessage {
            param,
            ivalue: ival,
            fvalue: fval,
            svalue: String::from(sval),
        }
    }
    pub fn as_json(&self) -> serde_json::Value {
        json!({
          "param": self.param as i64,
          "iValue": self.ivalue,
          "fValue": self.fvalue,
          "sValue": self.svalue,
        })
    }
    pub fn from_string(data: &str) -> Result<ParamMessage, BoxError> {
        let raw = serde_json::from_str(data)?;
        Self::from_json(&raw)
    }
    pub fn from_json(raw: &serde_json::Value) -> Result<ParamMessage, BoxError> {
        if !(raw["param"].is_i64() || raw["param"].is_string()) {
            bail!("no param in message");
        }
        let code: i64;
        if raw["param"].is_i64() {
            code = raw["param"].as_i64().unwrap_or(0);
        } else {
            code = str::parse(raw["param"].as_str().unwrap_or(""))?;
        }
        let param = match EngineParam::from_i64(code) {
            Some(p) => p,
            None => {
                bail!("unknown param code: {}", code);
            }
        };
        let mut msg = ParamMessage::new(param, 0, 0.0, "");
        if raw["iValue"].is_i64() {
            msg.ivalue = raw["iValue"].as_i64().unwrap_or(0);
        }
        if raw["iValue"].is_string() {
            msg.ivalue = str::parse(raw["iValue"].as_str().unwrap_or("0"))?;
        }
        if raw["fValue"].is_f64() {
            msg.fvalue = raw["fValue"].as_f64().unwrap_or(0.0);
        }
        if raw["fValue"].is_i64() {
            msg.fvalue = raw["fValue"].as_i64().unwrap_or(0) as f64;
        }
        if raw["sValue"].is_string() {
            msg.svalue = String::from(raw["sValue"].as_str().unwrap_or(""));
        }
        Ok(msg)
    }
}

impl fmt::Display for ParamMessage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{{ param: {:?}, ival: {}, fval: {} sval: {} }}",
            self.param, self.ivalue, self.fvalue, self.svalue
        )
    }
}
