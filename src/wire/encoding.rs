use alloc::vec::Vec;
use prost::bytes::BufMut;

use super::{proto, BytesBus, MessageBus, WireError};
use crate::{
    messages::{SettlementRequest, WatchtowerMessage},
    quorum::WatchtowerIdx,
};

/// Size of the big-endian length prefix in front of every frame.
const PREFIX_LEN: usize = 2;

/// [MessageBus] on top of a [BytesBus], encoding every message as a
/// length-prefixed protobuf frame.
#[derive(Debug)]
pub struct ProtoBufEncodingLayer<B: BytesBus> {
    pub bus: B,
}

impl<B: BytesBus> ProtoBufEncodingLayer<B> {
    pub fn new(bus: B) -> Self {
        ProtoBufEncodingLayer { bus }
    }

    /// Encode `msg` with a u16 length prefix instead of the varint
    /// prefix of `encode_length_delimited`.
    pub fn encode<T: prost::Message>(msg: &T) -> Result<Vec<u8>, WireError> {
        let len = msg.encoded_len();
        if len > u16::MAX as usize {
            return Err(WireError::TooLong(len));
        }

        let mut buf = Vec::with_capacity(PREFIX_LEN + len);
        buf.put_slice(&(len as u16).to_be_bytes());
        msg.encode(&mut buf)?;
        Ok(buf)
    }
}

impl<B: BytesBus> MessageBus for ProtoBufEncodingLayer<B> {
    fn send_to_watchtower(&self, idx: WatchtowerIdx, msg: WatchtowerMessage) {
        match Self::encode(&proto::WatchtowerMsg::new(idx, msg)) {
            Ok(buf) => self.bus.send_to_watchtower(idx, &buf),
            Err(e) => log::error!("dropping message to watchtower {}: {}", idx, e),
        }
    }

    fn submit(&self, req: SettlementRequest) {
        match Self::encode(&proto::SettlementRequest::from(req)) {
            Ok(buf) => self.bus.send_to_verifier(&buf),
            Err(e) => log::error!("dropping settlement request: {}", e),
        }
    }
}

fn decode_frame<T: prost::Message + Default>(frame: &[u8]) -> Result<T, WireError> {
    if frame.len() < PREFIX_LEN {
        return Err(WireError::Truncated {
            expected: PREFIX_LEN,
            actual: frame.len(),
        });
    }
    let len = u16::from_be_bytes([frame[0], frame[1]]) as usize;
    let body = &frame[PREFIX_LEN..];
    if body.len() < len {
        return Err(WireError::Truncated {
            expected: len,
            actual: body.len(),
        });
    }
    Ok(T::decode(&body[..len])?)
}

/// Decode a frame sent with [MessageBus::send_to_watchtower], returning the
/// index of the receiving watchtower together with the claim.
pub fn decode_watchtower_message(
    frame: &[u8],
) -> Result<(WatchtowerIdx, WatchtowerMessage), WireError> {
    let msg: proto::WatchtowerMsg = decode_frame(frame)?;
    Ok(msg.into_message()?)
}

/// Decode a frame sent with [MessageBus::submit].
pub fn decode_settlement_request(frame: &[u8]) -> Result<SettlementRequest, WireError> {
    let msg: proto::SettlementRequest = decode_frame(frame)?;
    Ok(msg.try_into()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        abiencode::types::{Address, Signature},
        messages::{SettlementCall, SignedChannelState, WatchtowerRevisionClaim},
        sig::Signer,
        state::ChannelState,
        wire::{tests::RecordingBytesBus, ConversionError},
    };
    use alloc::vec;

    fn addr(last: u8) -> Address {
        let mut a = [0u8; 20];
        a[19] = last;
        Address(a)
    }

    fn signer() -> Signer {
        let bytes: [u8; 32] = hex::decode(
            "cf163df783185ed9862902d89aaaee849004f5f79eb2b05f509046fcc27f48fb",
        )
        .unwrap()
        .try_into()
        .unwrap();
        Signer::from_private_key(&bytes).unwrap()
    }

    #[test]
    fn frames_carry_a_big_endian_length_prefix() {
        let layer = ProtoBufEncodingLayer::new(RecordingBytesBus::default());
        layer.submit(SettlementRequest {
            contract: addr(1),
            from: addr(2),
            call: SettlementCall::Open,
        });

        let frames = layer.bus.verifier.borrow();
        assert_eq!(frames.len(), 1);
        let frame = &frames[0];
        let len = u16::from_be_bytes([frame[0], frame[1]]) as usize;
        assert_eq!(len, frame.len() - PREFIX_LEN);
    }

    #[test]
    fn watchtower_frames_decode_to_the_same_claim() {
        let layer = ProtoBufEncodingLayer::new(RecordingBytesBus::default());
        let msg = WatchtowerMessage::Revision {
            contract: addr(7),
            claim: WatchtowerRevisionClaim {
                auto_increment: 513,
                alice_sig: Signature::new(&[0x11; 64], 27),
                ingrid_sig: Signature::new(&[0x22; 64], 28),
            },
        };
        layer.send_to_watchtower(4, msg);

        let frames = layer.bus.watchtowers.borrow();
        assert_eq!(frames[0].0, 4);
        assert_eq!(decode_watchtower_message(&frames[0].1), Ok((4, msg)));
    }

    #[test]
    fn pessimistic_close_request_keeps_aggregate() {
        let state = ChannelState {
            alice_value: 10.into(),
            channel_value: 17.into(),
            auto_increment: 3,
        };
        let signed = SignedChannelState::sign_state(&signer(), addr(7), state).unwrap();
        let req = SettlementRequest {
            contract: addr(7),
            from: addr(2),
            call: SettlementCall::PessimisticClose {
                state,
                counterparty_sig: signed.signature,
                aggregate: vec![signed, signed],
            },
        };
        let frame = ProtoBufEncodingLayer::<RecordingBytesBus>::encode(
            &proto::SettlementRequest::from(req.clone()),
        )
        .unwrap();
        let decoded = decode_settlement_request(&frame).unwrap();
        assert_eq!(decoded, req);
        if let SettlementCall::PessimisticClose { aggregate, .. } = decoded.call {
            aggregate[1].verify(signer().address()).unwrap();
        }
    }

    #[test]
    fn truncated_and_malformed_frames_are_rejected() {
        assert_eq!(
            decode_settlement_request(&[0x00]),
            Err(WireError::Truncated {
                expected: 2,
                actual: 1
            })
        );
        assert_eq!(
            decode_settlement_request(&[0x00, 0x05, 0x0a]),
            Err(WireError::Truncated {
                expected: 5,
                actual: 1
            })
        );

        // Address of 3 bytes.
        let msg = proto::SettlementRequest {
            contract: vec![1, 2, 3],
            from: addr(2).0.to_vec(),
            call: Some(proto::settlement_request::Call::Open(proto::Empty {})),
        };
        let frame = ProtoBufEncodingLayer::<RecordingBytesBus>::encode(&msg).unwrap();
        assert_eq!(
            decode_settlement_request(&frame),
            Err(WireError::Conversion(ConversionError::ByteLengthMismatch))
        );

        let msg = proto::SettlementRequest {
            contract: addr(1).0.to_vec(),
            from: addr(2).0.to_vec(),
            call: None,
        };
        let frame = ProtoBufEncodingLayer::<RecordingBytesBus>::encode(&msg).unwrap();
        assert_eq!(
            decode_settlement_request(&frame),
            Err(WireError::Conversion(ConversionError::ExpectedSome))
        );
    }

    #[test]
    fn oversized_messages_are_not_framed() {
        let msg = proto::AliceFund {
            ingrid: addr(1).0.to_vec(),
            watchtowers: vec![addr(2).0.to_vec(); 4000],
            value: vec![0; 32],
        };
        assert!(matches!(
            ProtoBufEncodingLayer::<RecordingBytesBus>::encode(&msg),
            Err(WireError::TooLong(_))
        ));
    }

    #[test]
    fn schema_file_declares_the_framed_tags() {
        let schema = include_str!("thunderdome.proto");
        for field in [
            "RevisionClaim revision = 3;",
            "VirtualClaim virtual = 4;",
            "AliceFund alice_fund = 3;",
            "Empty open = 6;",
            "PessimisticClose pessimistic_close = 10;",
            "Empty final_close = 14;",
            "repeated SignedChannelState aggregate = 3;",
        ] {
            assert!(schema.contains(field), "missing `{}`", field);
        }

        // Field 6 of SettlementRequest, an empty message: key 0x32, length 0.
        let frame = ProtoBufEncodingLayer::<RecordingBytesBus>::encode(&proto::SettlementRequest {
            contract: Vec::new(),
            from: Vec::new(),
            call: Some(proto::settlement_request::Call::Open(proto::Empty {})),
        })
        .unwrap();
        assert_eq!(frame, [0x00, 0x02, 0x32, 0x00]);
    }
}
