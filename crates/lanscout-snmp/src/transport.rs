//! Async UDP transport and BER codec for SNMP v2c GET

use anyhow::Result;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::timeout;
use tracing::{debug, trace};

/// BER tags used by the GET exchange
mod ber {
    pub const INTEGER: u8 = 0x02;
    pub const OCTET_STRING: u8 = 0x04;
    pub const NULL: u8 = 0x05;
    pub const OBJECT_IDENTIFIER: u8 = 0x06;
    pub const SEQUENCE: u8 = 0x30;
    pub const GET_REQUEST: u8 = 0xA0;
    pub const GET_RESPONSE: u8 = 0xA2;
    pub const COUNTER32: u8 = 0x41;
    pub const GAUGE32: u8 = 0x42;
    pub const TIMETICKS: u8 = 0x43;
    pub const COUNTER64: u8 = 0x46;
    pub const NO_SUCH_OBJECT: u8 = 0x80;
    pub const NO_SUCH_INSTANCE: u8 = 0x81;
    pub const END_OF_MIB_VIEW: u8 = 0x82;
}

/// SNMP version field value for v2c
const VERSION_2C: i64 = 1;

/// Largest response datagram we accept
const MAX_RESPONSE: usize = 1500;

/// A decoded varbind value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnmpValue {
    Integer(i64),
    Counter(u64),
    OctetString(String),
    Oid(String),
    /// NULL or one of the v2c "no such" markers
    Null,
}

impl SnmpValue {
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            SnmpValue::Counter(v) => Some(*v),
            SnmpValue::Integer(v) if *v >= 0 => Some(*v as u64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SnmpValue::Integer(v) => Some(*v),
            SnmpValue::Counter(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }
}

impl std::fmt::Display for SnmpValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SnmpValue::Integer(v) => write!(f, "{}", v),
            SnmpValue::Counter(v) => write!(f, "{}", v),
            SnmpValue::OctetString(s) => write!(f, "{}", s),
            SnmpValue::Oid(oid) => write!(f, "{}", oid),
            SnmpValue::Null => write!(f, "null"),
        }
    }
}

/// Async UDP transport for single-varbind SNMP GETs
pub struct SnmpTransport {
    socket: UdpSocket,
    target: SocketAddr,
    community: String,
    timeout_ms: u64,
    retries: u32,
    request_id: i32,
}

impl SnmpTransport {
    /// Create a new transport bound to an ephemeral local port
    pub async fn new(
        host: &str,
        port: u16,
        community: &str,
        timeout_ms: u64,
        retries: u32,
    ) -> Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        let target: SocketAddr = format!("{}:{}", host, port).parse()?;

        Ok(Self {
            socket,
            target,
            community: community.to_string(),
            timeout_ms,
            retries: retries.max(1),
            request_id: 1,
        })
    }

    fn next_request_id(&mut self) -> i32 {
        let id = self.request_id;
        self.request_id = self.request_id.wrapping_add(1);
        id
    }

    /// GET a single OID, retrying on timeout up to the configured budget
    pub async fn get(&mut self, oid: &str) -> Result<SnmpValue> {
        let request_id = self.next_request_id();
        let packet = encode_get_request(&self.community, request_id, oid)?;
        let duration = Duration::from_millis(self.timeout_ms);
        let mut buf = vec![0u8; MAX_RESPONSE];

        let mut last_err = anyhow::anyhow!("no response");
        for attempt in 1..=self.retries {
            trace!(
                target = %self.target,
                oid = oid,
                request_id = request_id,
                attempt = attempt,
                "sending SNMP GET"
            );
            self.socket.send_to(&packet, self.target).await?;

            match timeout(duration, self.socket.recv_from(&mut buf)).await {
                Ok(Ok((len, _addr))) => match decode_response(&buf[..len]) {
                    Ok((resp_id, value)) if resp_id == request_id => {
                        debug!(target = %self.target, oid = oid, value = %value, "SNMP GET ok");
                        return Ok(value);
                    }
                    Ok((resp_id, _)) => {
                        last_err = anyhow::anyhow!(
                            "request id mismatch: sent {}, got {}",
                            request_id,
                            resp_id
                        );
                    }
                    Err(e) => last_err = e,
                },
                Ok(Err(e)) => last_err = e.into(),
                Err(_) => {
                    last_err = anyhow::anyhow!("timed out after {}ms", self.timeout_ms);
                }
            }
        }

        Err(last_err)
    }
}

// -- BER encoding --------------------------------------------------------

fn encode_len(buf: &mut Vec<u8>, len: usize) {
    if len < 0x80 {
        buf.push(len as u8);
    } else {
        let mut bytes = Vec::new();
        let mut rest = len;
        while rest > 0 {
            bytes.push((rest & 0xFF) as u8);
            rest >>= 8;
        }
        bytes.reverse();
        buf.push(0x80 | bytes.len() as u8);
        buf.extend_from_slice(&bytes);
    }
}

fn encode_tlv(buf: &mut Vec<u8>, tag: u8, content: &[u8]) {
    buf.push(tag);
    encode_len(buf, content.len());
    buf.extend_from_slice(content);
}

/// Minimal two's-complement big-endian integer body
fn encode_integer(value: i64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let mut start = 0;
    while start < bytes.len() - 1 {
        let cur = bytes[start];
        let next_high = bytes[start + 1] & 0x80;
        if (cur == 0x00 && next_high == 0) || (cur == 0xFF && next_high != 0) {
            start += 1;
        } else {
            break;
        }
    }
    bytes[start..].to_vec()
}

fn encode_oid(oid: &str) -> Result<Vec<u8>> {
    let arcs: Vec<u64> = oid
        .split('.')
        .map(|p| p.parse::<u64>())
        .collect::<Result<_, _>>()
        .map_err(|_| anyhow::anyhow!("invalid oid: {}", oid))?;
    if arcs.len() < 2 || arcs[0] > 2 || arcs[1] > 39 {
        anyhow::bail!("invalid oid: {}", oid);
    }

    let mut out = vec![(arcs[0] * 40 + arcs[1]) as u8];
    for &arc in &arcs[2..] {
        let mut chunk = [0u8; 10];
        let mut i = chunk.len();
        let mut rest = arc;
        loop {
            i -= 1;
            chunk[i] = (rest & 0x7F) as u8;
            rest >>= 7;
            if rest == 0 {
                break;
            }
        }
        // continuation bit on all but the last septet
        for j in i..chunk.len() - 1 {
            chunk[j] |= 0x80;
        }
        out.extend_from_slice(&chunk[i..]);
    }
    Ok(out)
}

/// Build a v2c GetRequest message with a single NULL-valued varbind
fn encode_get_request(community: &str, request_id: i32, oid: &str) -> Result<Vec<u8>> {
    let mut varbind = Vec::new();
    encode_tlv(&mut varbind, ber::OBJECT_IDENTIFIER, &encode_oid(oid)?);
    encode_tlv(&mut varbind, ber::NULL, &[]);

    let mut varbind_list = Vec::new();
    encode_tlv(&mut varbind_list, ber::SEQUENCE, &varbind);

    let mut pdu = Vec::new();
    encode_tlv(&mut pdu, ber::INTEGER, &encode_integer(request_id as i64));
    encode_tlv(&mut pdu, ber::INTEGER, &encode_integer(0)); // error-status
    encode_tlv(&mut pdu, ber::INTEGER, &encode_integer(0)); // error-index
    encode_tlv(&mut pdu, ber::SEQUENCE, &varbind_list);

    let mut msg = Vec::new();
    encode_tlv(&mut msg, ber::INTEGER, &encode_integer(VERSION_2C));
    encode_tlv(&mut msg, ber::OCTET_STRING, community.as_bytes());
    encode_tlv(&mut msg, ber::GET_REQUEST, &pdu);

    let mut packet = Vec::new();
    encode_tlv(&mut packet, ber::SEQUENCE, &msg);
    Ok(packet)
}

// -- BER decoding --------------------------------------------------------

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn read_tlv(&mut self) -> Result<(u8, &'a [u8])> {
        if self.pos + 2 > self.data.len() {
            anyhow::bail!("truncated TLV header");
        }
        let tag = self.data[self.pos];
        self.pos += 1;

        let first = self.data[self.pos];
        self.pos += 1;
        let len = if first < 0x80 {
            first as usize
        } else {
            let n = (first & 0x7F) as usize;
            if n == 0 || n > 4 || self.pos + n > self.data.len() {
                anyhow::bail!("unsupported TLV length form");
            }
            let mut len = 0usize;
            for _ in 0..n {
                len = (len << 8) | self.data[self.pos] as usize;
                self.pos += 1;
            }
            len
        };

        if self.pos + len > self.data.len() {
            anyhow::bail!("TLV content truncated");
        }
        let content = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok((tag, content))
    }

    fn expect(&mut self, want: u8) -> Result<&'a [u8]> {
        let (tag, content) = self.read_tlv()?;
        if tag != want {
            anyhow::bail!("expected tag {:#04x}, got {:#04x}", want, tag);
        }
        Ok(content)
    }
}

fn decode_integer(content: &[u8]) -> i64 {
    let mut value: i64 = if content.first().map(|b| b & 0x80 != 0).unwrap_or(false) {
        -1
    } else {
        0
    };
    for &b in content {
        value = (value << 8) | b as i64;
    }
    value
}

fn decode_unsigned(content: &[u8]) -> u64 {
    let mut value: u64 = 0;
    for &b in content {
        value = (value << 8) | b as u64;
    }
    value
}

fn decode_oid(content: &[u8]) -> String {
    let mut arcs: Vec<u64> = Vec::new();
    if let Some(&first) = content.first() {
        arcs.push((first / 40) as u64);
        arcs.push((first % 40) as u64);
    }
    let mut acc: u64 = 0;
    for &b in &content[1.min(content.len())..] {
        acc = (acc << 7) | (b & 0x7F) as u64;
        if b & 0x80 == 0 {
            arcs.push(acc);
            acc = 0;
        }
    }
    arcs.iter()
        .map(|a| a.to_string())
        .collect::<Vec<_>>()
        .join(".")
}

/// Decode a GetResponse message down to (request-id, first varbind value)
fn decode_response(packet: &[u8]) -> Result<(i32, SnmpValue)> {
    let mut outer = Reader::new(packet);
    let msg = outer.expect(ber::SEQUENCE)?;

    let mut msg = Reader::new(msg);
    let _version = msg.expect(ber::INTEGER)?;
    let _community = msg.expect(ber::OCTET_STRING)?;
    let pdu = msg.expect(ber::GET_RESPONSE)?;

    let mut pdu = Reader::new(pdu);
    let request_id = decode_integer(pdu.expect(ber::INTEGER)?) as i32;
    let error_status = decode_integer(pdu.expect(ber::INTEGER)?);
    let error_index = decode_integer(pdu.expect(ber::INTEGER)?);
    if error_status != 0 {
        anyhow::bail!(
            "agent returned error-status {} at index {}",
            error_status,
            error_index
        );
    }

    let varbind_list = pdu.expect(ber::SEQUENCE)?;
    let mut varbind_list = Reader::new(varbind_list);
    let varbind = varbind_list.expect(ber::SEQUENCE)?;
    let mut varbind = Reader::new(varbind);
    let _oid = varbind.expect(ber::OBJECT_IDENTIFIER)?;

    let (tag, content) = varbind.read_tlv()?;
    let value = match tag {
        ber::INTEGER => SnmpValue::Integer(decode_integer(content)),
        ber::COUNTER32 | ber::GAUGE32 | ber::TIMETICKS | ber::COUNTER64 => {
            SnmpValue::Counter(decode_unsigned(content))
        }
        ber::OCTET_STRING => {
            SnmpValue::OctetString(String::from_utf8_lossy(content).trim().to_string())
        }
        ber::OBJECT_IDENTIFIER => SnmpValue::Oid(decode_oid(content)),
        ber::NULL | ber::NO_SUCH_OBJECT | ber::NO_SUCH_INSTANCE | ber::END_OF_MIB_VIEW => {
            SnmpValue::Null
        }
        other => anyhow::bail!("unsupported value tag {:#04x}", other),
    };

    Ok((request_id, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_integer_minimal() {
        assert_eq!(encode_integer(0), vec![0x00]);
        assert_eq!(encode_integer(127), vec![0x7F]);
        assert_eq!(encode_integer(128), vec![0x00, 0x80]);
        assert_eq!(encode_integer(-1), vec![0xFF]);
        assert_eq!(encode_integer(256), vec![0x01, 0x00]);
    }

    #[test]
    fn test_encode_oid_sys_name() {
        let encoded = encode_oid("1.3.6.1.2.1.1.5.0").unwrap();
        assert_eq!(encoded, vec![0x2B, 0x06, 0x01, 0x02, 0x01, 0x01, 0x05, 0x00]);
    }

    #[test]
    fn test_encode_oid_multibyte_arc() {
        // 840 = 0x348 -> 0x86 0x48 in base-128 with continuation
        let encoded = encode_oid("1.2.840").unwrap();
        assert_eq!(encoded, vec![0x2A, 0x86, 0x48]);
    }

    #[test]
    fn test_encode_oid_rejects_garbage() {
        assert!(encode_oid("not.an.oid").is_err());
        assert!(encode_oid("1").is_err());
    }

    #[test]
    fn test_get_request_layout() {
        let packet = encode_get_request("public", 7, "1.3.6.1.2.1.1.5.0").unwrap();
        // outer SEQUENCE
        assert_eq!(packet[0], ber::SEQUENCE);
        let mut msg = Reader::new(&packet);
        let msg = msg.expect(ber::SEQUENCE).unwrap();
        let mut msg = Reader::new(msg);
        assert_eq!(decode_integer(msg.expect(ber::INTEGER).unwrap()), VERSION_2C);
        assert_eq!(msg.expect(ber::OCTET_STRING).unwrap(), b"public");
        let pdu = msg.expect(ber::GET_REQUEST).unwrap();
        let mut pdu = Reader::new(pdu);
        assert_eq!(decode_integer(pdu.expect(ber::INTEGER).unwrap()), 7);
    }

    fn encode_response(request_id: i32, value_tag: u8, value_body: &[u8]) -> Vec<u8> {
        let mut varbind = Vec::new();
        encode_tlv(
            &mut varbind,
            ber::OBJECT_IDENTIFIER,
            &encode_oid("1.3.6.1.2.1.1.5.0").unwrap(),
        );
        encode_tlv(&mut varbind, value_tag, value_body);
        let mut varbind_list = Vec::new();
        encode_tlv(&mut varbind_list, ber::SEQUENCE, &varbind);
        let mut pdu = Vec::new();
        encode_tlv(&mut pdu, ber::INTEGER, &encode_integer(request_id as i64));
        encode_tlv(&mut pdu, ber::INTEGER, &encode_integer(0));
        encode_tlv(&mut pdu, ber::INTEGER, &encode_integer(0));
        encode_tlv(&mut pdu, ber::SEQUENCE, &varbind_list);
        let mut msg = Vec::new();
        encode_tlv(&mut msg, ber::INTEGER, &encode_integer(VERSION_2C));
        encode_tlv(&mut msg, ber::OCTET_STRING, b"public");
        encode_tlv(&mut msg, ber::GET_RESPONSE, &pdu);
        let mut packet = Vec::new();
        encode_tlv(&mut packet, ber::SEQUENCE, &msg);
        packet
    }

    #[test]
    fn test_decode_string_response() {
        let packet = encode_response(42, ber::OCTET_STRING, b"office-laser");
        let (request_id, value) = decode_response(&packet).unwrap();
        assert_eq!(request_id, 42);
        assert_eq!(value, SnmpValue::OctetString("office-laser".to_string()));
    }

    #[test]
    fn test_decode_counter_response() {
        let packet = encode_response(9, ber::COUNTER32, &[0x01, 0x00]);
        let (_, value) = decode_response(&packet).unwrap();
        assert_eq!(value, SnmpValue::Counter(256));
        assert_eq!(value.as_u64(), Some(256));
    }

    #[test]
    fn test_decode_no_such_object() {
        let packet = encode_response(3, ber::NO_SUCH_OBJECT, &[]);
        let (_, value) = decode_response(&packet).unwrap();
        assert_eq!(value, SnmpValue::Null);
    }

    #[test]
    fn test_decode_rejects_error_status() {
        let mut varbind = Vec::new();
        encode_tlv(
            &mut varbind,
            ber::OBJECT_IDENTIFIER,
            &encode_oid("1.3.6.1.2.1.1.5.0").unwrap(),
        );
        encode_tlv(&mut varbind, ber::NULL, &[]);
        let mut varbind_list = Vec::new();
        encode_tlv(&mut varbind_list, ber::SEQUENCE, &varbind);
        let mut pdu = Vec::new();
        encode_tlv(&mut pdu, ber::INTEGER, &encode_integer(1));
        encode_tlv(&mut pdu, ber::INTEGER, &encode_integer(2)); // noSuchName
        encode_tlv(&mut pdu, ber::INTEGER, &encode_integer(1));
        encode_tlv(&mut pdu, ber::SEQUENCE, &varbind_list);
        let mut msg = Vec::new();
        encode_tlv(&mut msg, ber::INTEGER, &encode_integer(VERSION_2C));
        encode_tlv(&mut msg, ber::OCTET_STRING, b"public");
        encode_tlv(&mut msg, ber::GET_RESPONSE, &pdu);
        let mut packet = Vec::new();
        encode_tlv(&mut packet, ber::SEQUENCE, &msg);

        assert!(decode_response(&packet).is_err());
    }

    #[test]
    fn test_decode_truncated_packet() {
        let packet = encode_response(1, ber::OCTET_STRING, b"x");
        assert!(decode_response(&packet[..packet.len() - 2]).is_err());
    }

    #[test]
    fn test_decode_oid_roundtrip() {
        let encoded = encode_oid("1.3.6.1.2.1.43.10.2.1.4.1.1").unwrap();
        assert_eq!(decode_oid(&encoded), "1.3.6.1.2.1.43.10.2.1.4.1.1");
    }
}
