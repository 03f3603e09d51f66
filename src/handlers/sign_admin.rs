use std::fmt;

use tracing::instrument;

use crate::error::ProtocolError;
use crate::hw::SignSession;
use crate::protocol::{CommandCode, special};

use super::frame_codec::{ResponseError, encode_hex};
use super::label::{Address, SignSelector};

/// Sign model byte reported by the sign-type query.
#[derive(Debug, Clone, Copy, Eq, PartialEq, derive_more::Into)]
pub struct SignType(u8);

impl SignType {
    /// Returns the raw model byte.
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }
}

impl fmt::Display for SignType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_ascii_graphic() {
            write!(f, "{}", char::from(self.0))
        } else {
            write!(f, "0x{:02x}", self.0)
        }
    }
}

/// Handler for bus administration commands.
pub struct SignAdminHandler;

impl SignAdminHandler {
    pub(crate) fn change_address_payload(new_address: Address) -> Vec<u8> {
        let mut payload = vec![CommandCode::WriteSpecial.tag(), special::SET_ADDRESS];
        payload.extend_from_slice(encode_hex(u32::from(new_address.value()), 2).as_bytes());
        payload
    }

    const SIGN_TYPE_QUERY: [u8; 2] = [CommandCode::ReadSpecial.tag(), special::SIGN_TYPE];
    const SIGN_TYPE_RESPONSE_TAG: [u8; 2] = [CommandCode::WriteSpecial.tag(), special::SIGN_TYPE];

    /// Assigns a new address to the signs matched by `selector` and rebinds
    /// the session to it.
    ///
    /// ```
    /// # fn demo(session: &mut ledsign::SignSession) -> Result<(), ledsign::ProtocolError> {
    /// use ledsign::{Address, SignAdminHandler, SignSelector};
    ///
    /// SignAdminHandler::change_address(session, Address::new(2)?, SignSelector::AllSigns)?;
    /// assert_eq!(Some(Address::new(2)?), session.address());
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error when the transport write fails; the session keeps its
    /// previous address in that case.
    #[instrument(skip(session), level = "info", fields(old_address = ?session.address()))]
    pub fn change_address(
        session: &mut SignSession,
        new_address: Address,
        selector: SignSelector,
    ) -> Result<(), ProtocolError> {
        let payload = Self::change_address_payload(new_address);
        session.send_command_with_selector(&payload, selector)?;
        session.rebind_address(new_address);
        tracing::info!(%new_address, "sign address changed");
        Ok(())
    }

    /// Queries the model of the addressed sign.
    ///
    /// # Errors
    ///
    /// Returns an error when the transport fails, no complete response
    /// arrives before the read timeout, the response echoes a different tag,
    /// or it carries no model byte.
    #[instrument(skip(session), level = "debug", fields(address = ?session.address()))]
    pub fn read_sign_type(session: &mut SignSession) -> Result<SignType, ProtocolError> {
        session.send_command(&Self::SIGN_TYPE_QUERY)?;
        let content = session.read_response(&Self::SIGN_TYPE_RESPONSE_TAG)?;
        content.first().map(|byte| SignType(*byte)).ok_or_else(|| {
            ResponseError::EmptyResponse {
                expected: String::from_utf8_lossy(&Self::SIGN_TYPE_RESPONSE_TAG).into_owned(),
            }
            .into()
        })
    }
}
