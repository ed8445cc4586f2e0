//! FLEX name fields are 8+3 for files and 11 characters for volume
//! labels, stored in fixed-width fields padded with spaces or NUL.

use super::types::Error;

fn is_name_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c==b'-' || c==b'_' || c==0xFF || c==b' ' || c==b'*' || c==b'.' || c==0
}

/// Decode one fixed-width field: characters up to the first pad byte,
/// after which only pad bytes may follow.
fn field(dat: &[u8]) -> Result<String,Error> {
    let mut ans = String::new();
    let mut padded = false;
    for c in dat {
        if !is_name_char(*c) {
            return Err(Error::BadName);
        }
        match (*c,padded) {
            (0,_) | (b' ',_) => padded = true,
            (_,true) => return Err(Error::BadName),
            (0xFF,false) => ans.push('?'),
            (c,false) => ans.push(c as char)
        }
    }
    Ok(ans)
}

/// Read an 8+3 file name, inserting a dot when the extension is present.
/// Embedded spaces and bytes outside the FLEX character set are invalid.
pub fn decode_file_name(dat: &[u8]) -> Result<String,Error> {
    let name = field(&dat[0..8])?;
    let ext = field(&dat[8..11])?;
    match ext.len() {
        0 => Ok(name),
        _ => Ok(format!("{}.{}",name,ext))
    }
}

/// Read an 11 character volume label.  Embedded spaces are allowed here;
/// trailing padding is dropped.
pub fn decode_label(dat: &[u8]) -> Result<String,Error> {
    let mut ans = String::new();
    for c in &dat[0..11] {
        if !is_name_char(*c) {
            return Err(Error::BadName);
        }
        match *c {
            0 => break,
            0xFF => ans.push('?'),
            c => ans.push(c as char)
        }
    }
    Ok(ans.trim_end().to_string())
}

/// Best effort rendering of a name field that failed to decode, for
/// messages and listings.
pub fn lossy_name(dat: &[u8;11]) -> String {
    let mut ans = String::new();
    for c in dat {
        match *c {
            0 | b' ' => {},
            c if c.is_ascii_graphic() => ans.push(c as char),
            _ => ans.push('?')
        }
    }
    match ans.len() {
        0 => "?".to_string(),
        _ => ans
    }
}

/// Pad a name and extension into the fixed 8+3 fields.
pub fn encode_file_name(name: &str,ext: &str) -> [u8;11] {
    let mut ans = [b' ';11];
    for (i,c) in name.bytes().take(8).enumerate() {
        ans[i] = c;
    }
    for (i,c) in ext.bytes().take(3).enumerate() {
        ans[8+i] = c;
    }
    ans
}

/// Pad a volume label into its 11 byte field.
pub fn encode_label(label: &str) -> [u8;11] {
    let mut ans = [b' ';11];
    for (i,c) in label.bytes().take(11).enumerate() {
        ans[i] = c;
    }
    ans
}

/// Coerce a host file name into FLEX rules: leading letter, then only
/// alphanumerics, `-` and `_`, 8 characters of name and 3 of extension.
/// Returns the name, the extension, and whether anything was changed.
pub fn coerce_host_name(host: &str) -> (String,String,bool) {
    let base = match host.rsplit_once('/') {
        Some((_,b)) => b,
        None => host
    };
    let (stem,ext_src) = match base.rsplit_once('.') {
        Some((s,e)) => (s,e),
        None => (base,"")
    };
    let mut coerced = false;
    let mut name = String::new();
    let mut rest = stem;
    match stem.chars().next() {
        Some(c) if c.is_ascii_alphabetic() => {
            name.push(c);
            rest = &stem[c.len_utf8()..];
        },
        _ => {
            name.push('x');
            coerced = true;
        }
    }
    for c in rest.chars() {
        if name.len() == 8 {
            coerced = true;
            break;
        }
        if c.is_ascii_alphanumeric() || c=='-' || c=='_' {
            name.push(c);
        } else {
            name.push('_');
            coerced = true;
        }
    }
    let mut ext = String::new();
    for c in ext_src.chars() {
        if ext.len() == 3 {
            coerced = true;
            break;
        }
        if c.is_ascii_alphanumeric() || c=='-' || c=='_' {
            ext.push(c);
        } else {
            ext.push('_');
            coerced = true;
        }
    }
    (name,ext,coerced)
}

/// The display form of a coerced name, `NAME.EXT` or just `NAME`.
pub fn full_name(name: &str,ext: &str) -> String {
    match ext.len() {
        0 => name.to_string(),
        _ => format!("{}.{}",name,ext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn decode_padded() {
        assert_eq!(decode_file_name(b"A       TXT").expect("bad name"),"A.TXT");
        assert_eq!(decode_file_name(b"STARTUP\0\0\0\0").expect("bad name"),"STARTUP");
        assert_eq!(decode_file_name(b"FLEX    SYS").expect("bad name"),"FLEX.SYS");
    }
    #[test]
    fn decode_invalid() {
        assert!(decode_file_name(b"A B     TXT").is_err());
        assert!(decode_file_name(b"A\x07     TXT").is_err());
        assert!(decode_file_name(b"ABC     T~X").is_err());
    }
    #[test]
    fn decode_labels() {
        assert_eq!(decode_label(b"TEST       ").expect("bad label"),"TEST");
        assert_eq!(decode_label(b"MY DISK\0\0\0\0").expect("bad label"),"MY DISK");
        assert!(decode_label(b"M{}DISK\0\0\0\0").is_err());
    }
    #[test]
    fn encode_padded() {
        assert_eq!(&encode_file_name("A","TXT"),b"A       TXT");
        assert_eq!(&encode_label("TEST"),b"TEST       ");
    }
    #[test]
    fn coercion() {
        assert_eq!(coerce_host_name("path/to/a.txt"),("a".to_string(),"txt".to_string(),false));
        assert_eq!(coerce_host_name("9lives.cmd"),("x9lives".to_string(),"cmd".to_string(),true));
        assert_eq!(coerce_host_name("read me.first"),("read_me".to_string(),"fir".to_string(),true));
        assert_eq!(coerce_host_name("verylongfilename.text"),("verylong".to_string(),"tex".to_string(),true));
    }
}
