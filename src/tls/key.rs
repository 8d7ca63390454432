//! Private keys as OpenSSL writes them (PKCS#1 RSA, SEC1 EC or PKCS#8),
//! rewrapped as PKCS#8.

use std::io;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rustls_pemfile::Item;

const TAG_INTEGER: u8 = 0x02;
const TAG_OCTET_STRING: u8 = 0x04;
const TAG_OBJECT: u8 = 0x06;
const TAG_SEQUENCE: u8 = 0x30;
/// `[0]` parameters field of an ECPrivateKey
const TAG_EC_PARAMETERS: u8 = 0xa0;

/// OID 1.2.840.113549.1.1.1
const RSA_ENCRYPTION: &[u8] = &[
    0x06, 0x09, 0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x01, 0x01,
];
/// OID 1.2.840.10045.2.1
const EC_PUBLIC_KEY: &[u8] = &[0x06, 0x07, 0x2a, 0x86, 0x48, 0xce, 0x3d, 0x02, 0x01];
const NULL: &[u8] = &[0x05, 0x00];

const PEM_LINE_WIDTH: usize = 64;

/// Re-encode the first private key found in `pem` as a PKCS#8 PEM document
pub(super) fn to_pkcs8_pem(pem: &[u8]) -> io::Result<String> {
    let der = to_pkcs8_der(pem)?;
    Ok(encode_pem("PRIVATE KEY", &der))
}

fn to_pkcs8_der(mut pem: &[u8]) -> io::Result<Vec<u8>> {
    for item in rustls_pemfile::read_all(&mut pem) {
        match item? {
            Item::Pkcs8Key(key) => return Ok(key.secret_pkcs8_der().to_vec()),
            Item::Pkcs1Key(key) => {
                let algorithm = [RSA_ENCRYPTION, NULL].concat();
                return Ok(private_key_info(&algorithm, key.secret_pkcs1_der()));
            }
            Item::Sec1Key(key) => {
                let der = key.secret_sec1_der();
                let algorithm = [EC_PUBLIC_KEY, sec1_curve(der)?].concat();
                return Ok(private_key_info(&algorithm, der));
            }
            _ => {}
        }
    }

    Err(invalid("no private key found"))
}

/// PrivateKeyInfo ::= SEQUENCE { version 0, AlgorithmIdentifier, OCTET STRING }
fn private_key_info(algorithm: &[u8], key: &[u8]) -> Vec<u8> {
    let mut body = vec![TAG_INTEGER, 0x01, 0x00];
    body.extend(encode_element(TAG_SEQUENCE, algorithm));
    body.extend(encode_element(TAG_OCTET_STRING, key));
    encode_element(TAG_SEQUENCE, &body)
}

fn encode_element(tag: u8, content: &[u8]) -> Vec<u8> {
    let mut out = vec![tag];
    let len = content.len();
    if len < 0x80 {
        out.push(len as u8);
    } else {
        let bytes = len.to_be_bytes();
        let skip = bytes.iter().take_while(|b| **b == 0).count();
        out.push(0x80 | (bytes.len() - skip) as u8);
        out.extend_from_slice(&bytes[skip..]);
    }
    out.extend_from_slice(content);
    out
}

struct Element<'a> {
    tag: u8,
    content: &'a [u8],
    /// Tag, length and content
    encoded: &'a [u8],
}

/// Split the next DER element off `input`
fn next_element<'a>(input: &mut &'a [u8]) -> io::Result<Element<'a>> {
    let data = *input;
    let malformed = || invalid("malformed EC private key");

    let (&tag, rest) = data.split_first().ok_or_else(malformed)?;
    let (&first, rest) = rest.split_first().ok_or_else(malformed)?;
    let (len, rest) = if first < 0x80 {
        (usize::from(first), rest)
    } else {
        let n = usize::from(first & 0x7f);
        if n == 0 || n > std::mem::size_of::<usize>() || rest.len() < n {
            return Err(malformed());
        }
        let len = rest[..n]
            .iter()
            .fold(0usize, |len, b| (len << 8) | usize::from(*b));
        (len, &rest[n..])
    };
    if rest.len() < len {
        return Err(malformed());
    }

    let header = data.len() - rest.len();
    *input = &rest[len..];
    Ok(Element {
        tag,
        content: &rest[..len],
        encoded: &data[..header + len],
    })
}

/// Curve OID of an ECPrivateKey, as a complete DER element
fn sec1_curve(der: &[u8]) -> io::Result<&[u8]> {
    let mut input = der;
    let key = next_element(&mut input)?;
    if key.tag != TAG_SEQUENCE {
        return Err(invalid("malformed EC private key"));
    }

    let mut fields = key.content;
    while !fields.is_empty() {
        let field = next_element(&mut fields)?;
        if field.tag == TAG_EC_PARAMETERS {
            let mut params = field.content;
            let curve = next_element(&mut params)?;
            if curve.tag == TAG_OBJECT {
                return Ok(curve.encoded);
            }
        }
    }

    Err(invalid("EC private key does not name its curve"))
}

fn encode_pem(label: &str, der: &[u8]) -> String {
    let body = STANDARD.encode(der);
    let mut pem = format!("-----BEGIN {label}-----\n");
    let mut rest = body.as_str();
    while !rest.is_empty() {
        let (line, tail) = rest.split_at(rest.len().min(PEM_LINE_WIDTH));
        pem.push_str(line);
        pem.push('\n');
        rest = tail;
    }
    pem.push_str(&format!("-----END {label}-----\n"));
    pem
}

fn invalid(message: &'static str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message)
}
