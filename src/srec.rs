//! # Motorola S-record conversion
//!
//! Turns an S19 stream into the FLEX CMD loader format: data records are
//! `(0x02, addr_hi, addr_lo, len)` followed by up to 252 bytes, and the S9
//! terminator becomes a `(0x16, addr_hi, addr_lo)` transfer record.  Only
//! 16-bit addressing makes sense for a 6800/6809, so S2/S3/S7/S8 are
//! rejected outright.

use log::{debug,info};
use crate::DYNERR;

/// largest data payload of one CMD record
const CMD_CHUNK: usize = 252;

#[derive(thiserror::Error,Debug)]
pub enum Error {
    #[error("empty input file")]
    Empty,
    #[error("not a Motorola S19 file")]
    NotSrec,
    #[error("unexpected char or EOF")]
    Syntax,
    #[error("checksum error")]
    Checksum,
    #[error("24 or 32 bit addresses not supported")]
    Unsupported,
    #[error("address overflow")]
    AddressOverflow
}

struct HexReader<'a> {
    src: &'a [u8],
    pos: usize
}

impl<'a> HexReader<'a> {
    fn new(src: &'a [u8]) -> Self {
        Self { src, pos: 0 }
    }
    /// next byte, newlines skipped
    fn next_char(&mut self) -> Option<u8> {
        while self.pos < self.src.len() {
            let c = self.src[self.pos];
            self.pos += 1;
            if c != b'\r' && c != b'\n' {
                return Some(c);
            }
        }
        None
    }
    fn hex(&mut self,n_chars: usize) -> Result<usize,Error> {
        let mut ans = 0;
        for _i in 0..n_chars {
            let c = match self.next_char() {
                Some(c) => c,
                None => return Err(Error::Syntax)
            };
            let digit = match c {
                b'0'..=b'9' => c - b'0',
                b'A'..=b'F' => c - b'A' + 10,
                b'a'..=b'f' => c - b'a' + 10,
                _ => return Err(Error::Syntax)
            };
            ans = ans*16 + digit as usize;
        }
        Ok(ans)
    }
}

/// Convert an S19 byte stream to a CMD byte stream, verifying every
/// record checksum on the way.  The output is padded with zeroes to the
/// 252-byte record boundary FLEX expects.
pub fn s19_to_cmd(src: &[u8]) -> Result<Vec<u8>,DYNERR> {
    let mut rdr = HexReader::new(src);
    let mut out: Vec<u8> = Vec::new();
    // the open data record, header included
    let mut buffer: Vec<u8> = Vec::new();
    let mut address = 0;
    loop {
        let c = match rdr.next_char() {
            Some(c) => c,
            None => {
                if buffer.is_empty() {
                    return Err(Box::new(Error::Empty));
                }
                out.append(&mut buffer);
                let pad = CMD_CHUNK - out.len() % CMD_CHUNK;
                out.extend(std::iter::repeat(0).take(pad));
                return Ok(out);
            }
        };
        if c != b'S' {
            return Err(Box::new(Error::NotSrec));
        }
        let line_type = match rdr.next_char() {
            Some(c) => c,
            None => return Err(Box::new(Error::Syntax))
        };
        let count = rdr.hex(2)?;
        if count < 3 {
            return Err(Box::new(Error::Syntax));
        }
        let addr = rdr.hex(4)?;
        let mut checksum = count + (addr >> 8) + (addr & 0xFF);
        let count = count - 3;
        match line_type {
            // header record, checked but otherwise ignored
            b'0' => {
                let mut header = String::new();
                for _i in 0..count {
                    let c = rdr.hex(2)?;
                    checksum += c;
                    if c >= 0x20 && c < 0x7F {
                        header.push(c as u8 as char);
                    }
                }
                info!("header: \"{}\"",header);
            },
            b'1' => {
                // a discontinuity or a full record flushes the open chunk
                if buffer.len() + count > CMD_CHUNK + 4 || (address != addr && !buffer.is_empty()) {
                    buffer[3] = (buffer.len() - 4) as u8;
                    debug!("write {} bytes at {:04X}",buffer.len()-4,((buffer[1] as usize)<<8)+buffer[2] as usize);
                    out.append(&mut buffer);
                }
                if buffer.is_empty() {
                    buffer = vec![0x02,(addr >> 8) as u8,(addr & 0xFF) as u8,0];
                    address = addr;
                }
                for _i in 0..count {
                    if address + 1 > 0xFFFF {
                        return Err(Box::new(Error::AddressOverflow));
                    }
                    address += 1;
                    let c = rdr.hex(2)?;
                    checksum += c;
                    buffer.push(c as u8);
                }
            },
            b'2' | b'3' | b'7' | b'8' => {
                return Err(Box::new(Error::Unsupported));
            },
            // record counts carry nothing useful here
            b'5' | b'6' => {
                for _i in 0..count {
                    checksum += rdr.hex(2)?;
                }
            },
            b'9' => {
                if buffer.len() >= 4 {
                    buffer[3] = (buffer.len() - 4) as u8;
                }
                buffer.push(0x16);
                buffer.push((addr >> 8) as u8);
                buffer.push((addr & 0xFF) as u8);
                info!("load address = {:04X}",addr);
            },
            _ => {
                return Err(Box::new(Error::NotSrec));
            }
        }
        let c = rdr.hex(2)?;
        if (((checksum + c) & 0xFF) ^ 0xFF) != 0 {
            return Err(Box::new(Error::Checksum));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    /// build one record from the type character and the count+addr+data
    /// hex, appending the correct checksum
    fn srec(typ: char,body: &str) -> String {
        let bytes: Vec<u8> = (0..body.len()/2).map(|i| u8::from_str_radix(&body[2*i..2*i+2],16).unwrap()).collect();
        let sum: usize = bytes.iter().map(|b| *b as usize).sum();
        format!("S{}{}{:02X}",typ,body,0xFF - (sum & 0xFF))
    }
    #[test]
    fn simple_data_record() {
        // 16 bytes at address 0, then a transfer record
        let src = format!("{}\nS9030000FC\n",srec('1',"130000000102030405060708090A0B0C0D0E0F"));
        let cmd = s19_to_cmd(src.as_bytes()).expect("conversion failed");
        assert_eq!(cmd.len(),252);
        assert_eq!(&cmd[0..4],&[0x02,0x00,0x00,0x10]);
        assert_eq!(&cmd[4..20],&[0,1,2,3,4,5,6,7,8,9,10,11,12,13,14,15]);
        assert_eq!(&cmd[20..23],&[0x16,0x00,0x00]);
        assert!(cmd[23..].iter().all(|b| *b==0));
    }
    #[test]
    fn discontinuity_splits_records() {
        let src = format!("{}\n{}\nS9030000FC\n",srec('1',"05100AAABB"),srec('1',"05300CCCDD"));
        let cmd = s19_to_cmd(src.as_bytes()).expect("conversion failed");
        assert_eq!(&cmd[0..6],&[0x02,0x10,0x0A,0x02,0xAA,0xBB]);
        assert_eq!(&cmd[6..12],&[0x02,0x30,0x0C,0x02,0xCC,0xDD]);
        assert_eq!(&cmd[12..15],&[0x16,0x00,0x00]);
    }
    #[test]
    fn contiguous_records_merge() {
        let src = format!("{}\n{}\nS9030000FC\n",srec('1',"05100AAABB"),srec('1',"05100CCCDD"));
        let cmd = s19_to_cmd(src.as_bytes()).expect("conversion failed");
        assert_eq!(&cmd[0..8],&[0x02,0x10,0x0A,0x04,0xAA,0xBB,0xCC,0xDD]);
        assert_eq!(&cmd[8..11],&[0x16,0x00,0x00]);
    }
    #[test]
    fn header_is_ignored() {
        let src = format!("{}\n{}\nS9030000FC\n",srec('0',"060000484452"),srec('1',"05000AAABB"));
        let cmd = s19_to_cmd(src.as_bytes()).expect("conversion failed");
        assert_eq!(&cmd[0..6],&[0x02,0x00,0x0A,0x02,0xAA,0xBB]);
    }
    #[test]
    fn bad_checksum_rejected() {
        let src = "S1130000000102030405060708090A0B0C0D0E0F00\nS9030000FC\n";
        match s19_to_cmd(src.as_bytes()) {
            Err(e) => assert_eq!(e.to_string(),"checksum error"),
            Ok(_) => panic!("accepted bad checksum")
        }
    }
    #[test]
    fn wide_addresses_rejected() {
        let src = "S214000000000102030405060708090A0B0C0D0E0FE4\n";
        match s19_to_cmd(src.as_bytes()) {
            Err(e) => assert_eq!(e.to_string(),"24 or 32 bit addresses not supported"),
            Ok(_) => panic!("accepted S2 record")
        }
    }
    #[test]
    fn empty_input() {
        assert!(s19_to_cmd(b"").is_err());
    }
}
