use thiserror::Error;

/// Errors produced while parsing or validating protocol-level data.
#[derive(Error, Debug, PartialEq)]
pub enum ProtocolError {
    #[error("data has incorrect or corrupted field: {0}")]
    Invalid(InvalidField),
    #[error("failed UTF-8 decoding of domain name: {0}")]
    DomainNameDecoding(std::string::FromUtf8Error),
    #[error("unable to resolve domain name '{0}'")]
    UnresolvedDomainName(String),
    #[error("no acceptable authentication method offered by client")]
    NoAcceptableAuthMethod,
    #[error("username/password authentication failed")]
    AuthenticationFailed,
    #[error("malformed UDP relay datagram: {0}")]
    InvalidDatagram(InvalidField),
    #[error("timed out waiting for bound connection from expected peer")]
    BindTimeout,
}

#[derive(Error, Debug, PartialEq)]
pub enum InvalidField {
    #[error("invalid 'reserved' value {0:#04x}")]
    Reserved(u8),
    #[error("invalid address type {0:#04x}")]
    AddressType(u8),
    #[error("invalid protocol version {0:#04x}")]
    ProtocolVersion(u8),
    #[error("invalid authentication method {0:#04x}")]
    AuthMethod(u8),
    #[error("invalid SOCKS command {0:#04x}")]
    Command(u8),
    #[error("non-zero fragment number {0} is not supported")]
    Fragment(u8),
}
