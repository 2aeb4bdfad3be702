//! # Cipher text
//!
//! Module dedicated to the [`CipherText`] value type: one encrypted
//! PGP message available both as armored text and as its raw key and
//! data packets.

use std::io::Cursor;

use native::{ser::Serialize, Deserializable, Message};

use crate::{Error, Result};

/// An encrypted PGP message.
///
/// The armored text, the key packet and the data packet always
/// describe the same message: the armored form is split into packets
/// when built from armor, and the packets are armored when built from
/// packets.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CipherText {
    armored: String,
    key_packet: Vec<u8>,
    data_packet: Vec<u8>,
}

impl CipherText {
    /// Builds a cipher text from an armored PGP message.
    ///
    /// Fails if the message is not an encrypted message carrying at
    /// least one key packet.
    pub fn from_armored(armored: impl ToString) -> Result<Self> {
        let armored = armored.to_string();
        let (msg, _) = Message::from_armor_single(Cursor::new(armored.as_bytes()))
            .map_err(Error::ImportMessageFromArmorError)?;
        let (key_packet, data_packet) = split(&msg)?;

        Ok(Self {
            armored,
            key_packet,
            data_packet,
        })
    }

    /// Builds a cipher text from its key and data packets.
    pub fn from_packets(
        key_packet: impl Into<Vec<u8>>,
        data_packet: impl Into<Vec<u8>>,
    ) -> Result<Self> {
        let key_packet = key_packet.into();
        let data_packet = data_packet.into();

        if key_packet.is_empty() {
            return Err(Error::JoinEmptyPacketError("key"));
        }

        if data_packet.is_empty() {
            return Err(Error::JoinEmptyPacketError("data"));
        }

        let msg = join(&key_packet, &data_packet)?;
        let armored = msg
            .to_armored_string(None)
            .map_err(Error::ExportMessageToArmorError)?;

        Ok(Self {
            armored,
            key_packet,
            data_packet,
        })
    }

    /// Builds a cipher text from an encrypted engine message.
    pub(crate) fn from_message(msg: &Message) -> Result<Self> {
        let (key_packet, data_packet) = split(msg)?;
        let armored = msg
            .to_armored_string(None)
            .map_err(Error::ExportMessageToArmorError)?;

        Ok(Self {
            armored,
            key_packet,
            data_packet,
        })
    }

    /// Rebuilds the engine message out of the packets.
    pub(crate) fn to_message(&self) -> Result<Message> {
        join(&self.key_packet, &self.data_packet)
    }

    pub fn armored(&self) -> &str {
        &self.armored
    }

    pub fn key_packet(&self) -> &[u8] {
        &self.key_packet
    }

    pub fn data_packet(&self) -> &[u8] {
        &self.data_packet
    }

    pub fn into_armored(self) -> String {
        self.armored
    }

    pub fn into_packets(self) -> (Vec<u8>, Vec<u8>) {
        (self.key_packet, self.data_packet)
    }
}

/// Splits an encrypted message into its key packets (all of them,
/// concatenated) and its data packet.
fn split(msg: &Message) -> Result<(Vec<u8>, Vec<u8>)> {
    match msg {
        Message::Encrypted { esk, edata } => {
            if esk.is_empty() {
                return Err(Error::SplitMessageMissingKeyPacketError);
            }

            let mut key_packet = Vec::new();
            for esk in esk {
                esk.to_writer(&mut key_packet)
                    .map_err(Error::ExportPacketError)?;
            }

            let data_packet = edata.to_bytes().map_err(Error::ExportPacketError)?;

            Ok((key_packet, data_packet))
        }
        _ => Err(Error::SplitMessageNotEncryptedError),
    }
}

/// Joins key and data packets back into one encrypted message.
fn join(key_packet: &[u8], data_packet: &[u8]) -> Result<Message> {
    let mut bytes = Vec::with_capacity(key_packet.len() + data_packet.len());
    bytes.extend_from_slice(key_packet);
    bytes.extend_from_slice(data_packet);

    let msg =
        Message::from_bytes(Cursor::new(bytes)).map_err(Error::ImportMessageFromPacketsError)?;

    match msg {
        Message::Encrypted { .. } => Ok(msg),
        _ => Err(Error::SplitMessageNotEncryptedError),
    }
}
