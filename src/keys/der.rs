//! Minimal DER reader for PEM key bodies
//!
//! Only walks TLV structure far enough to collect OBJECT IDENTIFIERs, which
//! is all that is needed to tell RSA, Ed25519 and the ECDSA curves apart in
//! SEC1 (`EC PRIVATE KEY`) and PKCS#8 (`PRIVATE KEY`) bodies.

use super::format::KeyAlgorithm;

const TAG_OID: u8 = 0x06;
const CONSTRUCTED: u8 = 0x20;
const MAX_DEPTH: usize = 8;

// Encoded OID contents (no tag/length)
const OID_RSA_ENCRYPTION: &[u8] = &[0x2A, 0x86, 0x48, 0x86, 0xF7, 0x0D, 0x01, 0x01, 0x01];
const OID_ED25519: &[u8] = &[0x2B, 0x65, 0x70];
const OID_PRIME256V1: &[u8] = &[0x2A, 0x86, 0x48, 0xCE, 0x3D, 0x03, 0x01, 0x07];
const OID_SECP384R1: &[u8] = &[0x2B, 0x81, 0x04, 0x00, 0x22];
const OID_SECP521R1: &[u8] = &[0x2B, 0x81, 0x04, 0x00, 0x23];

/// Algorithm named by the OIDs in a DER structure, if any is known
pub fn algorithm_from_der(der: &[u8]) -> Option<KeyAlgorithm> {
    let mut oids = Vec::new();
    collect_oids(der, 0, &mut oids);

    // id-ecPublicKey alone does not name a curve; the curve OID does
    oids.iter().find_map(|oid| match *oid {
        OID_ED25519 => Some(KeyAlgorithm::Ed25519),
        OID_RSA_ENCRYPTION => Some(KeyAlgorithm::Rsa),
        OID_PRIME256V1 => Some(KeyAlgorithm::EcdsaP256),
        OID_SECP384R1 => Some(KeyAlgorithm::EcdsaP384),
        OID_SECP521R1 => Some(KeyAlgorithm::EcdsaP521),
        _ => None,
    })
}

fn collect_oids<'a>(mut data: &'a [u8], depth: usize, out: &mut Vec<&'a [u8]>) {
    while let Some((tag, body, rest)) = read_tlv(data) {
        if tag == TAG_OID {
            out.push(body);
        } else if tag & CONSTRUCTED != 0 && depth < MAX_DEPTH {
            collect_oids(body, depth + 1, out);
        }
        data = rest;
    }
}

/// Split one TLV off the front of `data`: `(tag, contents, remainder)`
fn read_tlv(data: &[u8]) -> Option<(u8, &[u8], &[u8])> {
    let (&tag, rest) = data.split_first()?;
    // High tag numbers never appear in key structures
    if tag & 0x1F == 0x1F {
        return None;
    }

    let (&first, mut rest) = rest.split_first()?;
    let len = if first & 0x80 == 0 {
        first as usize
    } else {
        let count = (first & 0x7F) as usize;
        if count == 0 || count > 4 || rest.len() < count {
            return None;
        }
        let len = rest[..count]
            .iter()
            .fold(0usize, |acc, &b| (acc << 8) | b as usize);
        rest = &rest[count..];
        len
    };

    if rest.len() < len {
        return None;
    }
    Some((tag, &rest[..len], &rest[len..]))
}
