//! Minimal STUN (RFC 5389) binding codec, IPv4 only.

use rand::RngCore;
use std::net::{Ipv4Addr, SocketAddrV4};

const BINDING_REQUEST: u16 = 0x0001;
const BINDING_SUCCESS: u16 = 0x0101;
const MAGIC_COOKIE: u32 = 0x2112_A442;
const ATTR_MAPPED_ADDRESS: u16 = 0x0001;
const ATTR_XOR_MAPPED_ADDRESS: u16 = 0x0020;
const FAMILY_IPV4: u8 = 0x01;
const HEADER_LEN: usize = 20;

pub type TransactionId = [u8; 12];

pub fn new_transaction_id() -> TransactionId {
    let mut id = [0u8; 12];
    rand::thread_rng().fill_bytes(&mut id);
    id
}

/// Attribute-less binding request.
pub fn binding_request(txn: &TransactionId) -> Vec<u8> {
    let mut msg = Vec::with_capacity(HEADER_LEN);
    msg.extend_from_slice(&BINDING_REQUEST.to_be_bytes());
    msg.extend_from_slice(&0u16.to_be_bytes());
    msg.extend_from_slice(&MAGIC_COOKIE.to_be_bytes());
    msg.extend_from_slice(txn);
    msg
}

/// Reflexive address from a binding success response to `txn`.
///
/// XOR-MAPPED-ADDRESS wins over MAPPED-ADDRESS when both are present.
pub fn parse_binding_response(data: &[u8], txn: &TransactionId) -> Option<SocketAddrV4> {
    if data.len() < HEADER_LEN {
        return None;
    }
    if u16::from_be_bytes([data[0], data[1]]) != BINDING_SUCCESS {
        return None;
    }
    let msg_len = u16::from_be_bytes([data[2], data[3]]) as usize;
    if data.len() < HEADER_LEN + msg_len {
        return None;
    }
    if u32::from_be_bytes([data[4], data[5], data[6], data[7]]) != MAGIC_COOKIE {
        return None;
    }
    if data[8..HEADER_LEN] != txn[..] {
        return None;
    }

    let end = HEADER_LEN + msg_len;
    let mut pos = HEADER_LEN;
    let mut mapped = None;
    let mut xor_mapped = None;

    while pos + 4 <= end {
        let attr_type = u16::from_be_bytes([data[pos], data[pos + 1]]);
        let attr_len = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
        pos += 4;
        if pos + attr_len > end {
            break;
        }
        let value = &data[pos..pos + attr_len];

        match attr_type {
            ATTR_MAPPED_ADDRESS => mapped = parse_address(value, false),
            ATTR_XOR_MAPPED_ADDRESS => xor_mapped = parse_address(value, true),
            _ => {}
        }
        pos += (attr_len + 3) & !3;
    }

    xor_mapped.or(mapped)
}

fn parse_address(value: &[u8], xored: bool) -> Option<SocketAddrV4> {
    if value.len() < 8 || value[1] != FAMILY_IPV4 {
        return None;
    }

    let mut port = u16::from_be_bytes([value[2], value[3]]);
    let mut ip = [value[4], value[5], value[6], value[7]];

    if xored {
        port ^= (MAGIC_COOKIE >> 16) as u16;
        for (b, c) in ip.iter_mut().zip(MAGIC_COOKIE.to_be_bytes()) {
            *b ^= c;
        }
    }

    Some(SocketAddrV4::new(Ipv4Addr::from(ip), port))
}

/// Binding success carrying a single XOR-MAPPED-ADDRESS.
#[cfg(test)]
pub(crate) fn binding_success(txn: &TransactionId, mapped: SocketAddrV4) -> Vec<u8> {
    let mut msg = Vec::with_capacity(HEADER_LEN + 12);
    msg.extend_from_slice(&BINDING_SUCCESS.to_be_bytes());
    msg.extend_from_slice(&12u16.to_be_bytes());
    msg.extend_from_slice(&MAGIC_COOKIE.to_be_bytes());
    msg.extend_from_slice(txn);

    msg.extend_from_slice(&ATTR_XOR_MAPPED_ADDRESS.to_be_bytes());
    msg.extend_from_slice(&8u16.to_be_bytes());
    msg.push(0);
    msg.push(FAMILY_IPV4);
    msg.extend_from_slice(&(mapped.port() ^ (MAGIC_COOKIE >> 16) as u16).to_be_bytes());
    for (b, c) in mapped.ip().octets().iter().zip(MAGIC_COOKIE.to_be_bytes()) {
        msg.push(b ^ c);
    }
    msg
}
