// TCM Set Operator Auth - Result Codes
//
// Decoding of the 32-bit result codes returned by the module service.

use std::fmt;

/// Mask selecting the error layer bits of a result code.
const LAYER_MASK: u32 = 0x0000_f000;

/// Mask selecting the layer-local error code.
const CODE_MASK: u32 = 0x0000_0fff;

/// Layer that produced a result code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    /// The module itself.
    Module,
    /// The device driver library.
    Driver,
    /// The core services daemon.
    CoreService,
    /// The service provider library linked into the tool.
    ServiceProvider,
    /// Any layer value not defined above.
    Unknown(u32),
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Layer::Module => f.write_str("tcm"),
            Layer::Driver => f.write_str("tddl"),
            Layer::CoreService => f.write_str("tcs"),
            Layer::ServiceProvider => f.write_str("tsp"),
            Layer::Unknown(raw) => write!(f, "unknown(0x{:x})", raw),
        }
    }
}

/// Result code returned by every module service call.
///
/// Zero means success. Otherwise bits 12..16 carry the [`Layer`] and the low
/// twelve bits carry the layer-local code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResultCode(pub u32);

impl ResultCode {
    pub const SUCCESS: ResultCode = ResultCode(0);

    // Module layer
    pub const AUTH_FAIL: ResultCode = ResultCode(0x0001);
    pub const BAD_PARAMETER: ResultCode = ResultCode(0x0003);
    pub const DEACTIVATED: ResultCode = ResultCode(0x0006);
    pub const DISABLED: ResultCode = ResultCode(0x0007);
    pub const FAIL: ResultCode = ResultCode(0x0009);
    pub const BAD_PRESENCE: ResultCode = ResultCode(0x002d);

    // Service provider layer
    pub const TSP_FAIL: ResultCode = ResultCode(0x3002);
    pub const TSP_BAD_PARAMETER: ResultCode = ResultCode(0x3003);
    pub const TSP_OUT_OF_MEMORY: ResultCode = ResultCode(0x3005);
    pub const TSP_NO_CONNECTION: ResultCode = ResultCode(0x3102);
    pub const TSP_INVALID_HANDLE: ResultCode = ResultCode(0x3126);

    pub fn is_success(self) -> bool {
        self.0 == 0
    }

    pub fn layer(self) -> Layer {
        match self.0 & LAYER_MASK {
            0x0000 => Layer::Module,
            0x1000 => Layer::Driver,
            0x2000 => Layer::CoreService,
            0x3000 => Layer::ServiceProvider,
            other => Layer::Unknown(other >> 12),
        }
    }

    pub fn code(self) -> u32 {
        self.0 & CODE_MASK
    }

    /// Short human-readable description of the code.
    pub fn description(self) -> &'static str {
        if self.is_success() {
            return "Success";
        }

        match (self.layer(), self.code()) {
            (Layer::Module, 0x001) => "Authentication failed",
            (Layer::Module, 0x003) => "One or more parameter is bad",
            (Layer::Module, 0x006) => "The module is deactivated",
            (Layer::Module, 0x007) => "The module is disabled",
            (Layer::Module, 0x009) => "The operation failed",
            (Layer::Module, 0x02d) => "Physical presence is required and not asserted",
            (Layer::ServiceProvider, 0x002) => "General failure",
            (Layer::ServiceProvider, 0x003) => "Bad parameter",
            (Layer::ServiceProvider, 0x005) => "Out of memory",
            (Layer::ServiceProvider, 0x102) => "No connection to the module service",
            (Layer::ServiceProvider, 0x126) => "Invalid handle",
            _ => "Unknown error",
        }
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "0x{:08x} - layer={}, code={:04x} ({}), {}",
            self.0,
            self.layer(),
            self.code(),
            self.code(),
            self.description()
        )
    }
}

impl std::error::Error for ResultCode {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_code() {
        assert!(ResultCode::SUCCESS.is_success());
        assert!(!ResultCode::AUTH_FAIL.is_success());
        assert_eq!(ResultCode::SUCCESS.description(), "Success");
    }

    #[test]
    fn test_layer_decoding() {
        assert_eq!(ResultCode::BAD_PRESENCE.layer(), Layer::Module);
        assert_eq!(ResultCode::TSP_NO_CONNECTION.layer(), Layer::ServiceProvider);
        assert_eq!(ResultCode(0x1001).layer(), Layer::Driver);
        assert_eq!(ResultCode(0x2004).layer(), Layer::CoreService);
        assert_eq!(ResultCode(0x5001).layer(), Layer::Unknown(5));
    }

    #[test]
    fn test_display_format() {
        let rendered = ResultCode::TSP_NO_CONNECTION.to_string();
        assert_eq!(
            rendered,
            "0x00003102 - layer=tsp, code=0102 (258), No connection to the module service"
        );
    }

    #[test]
    fn test_unknown_code_description() {
        assert_eq!(ResultCode(0x0fff).description(), "Unknown error");
    }
}
