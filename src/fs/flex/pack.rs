//! FLEX text files end lines with CR, drop trailing spaces, and compress
//! runs of spaces into a TAB byte followed by the count.  These filters
//! translate between that form and ordinary Unix text.

/// Unix text to FLEX text.  Host tabs are expanded against `tabstop`
/// before the space runs are re-compressed.
pub fn pack(src: &[u8],tabstop: usize) -> Vec<u8> {
    let mut ans = Vec::new();
    let mut line_length = 0;
    let mut nspace: usize = 0;
    for c in src {
        match *c {
            b' ' => {
                nspace += 1;
                line_length += 1;
            },
            b'\t' => {
                nspace += tabstop - (line_length % tabstop);
            },
            b'\n' => {
                // pending spaces are trailing, throw them away
                nspace = 0;
                line_length = 0;
                ans.push(b'\r');
            },
            c => {
                match nspace {
                    0 => {},
                    1 => ans.push(b' '),
                    2 => ans.extend_from_slice(b"  "),
                    n => {
                        ans.push(b'\t');
                        ans.push((n & 0x7f) as u8);
                    }
                }
                nspace = 0;
                ans.push(c);
                line_length += 1;
            }
        }
    }
    ans
}

/// FLEX text to Unix text: CR becomes LF, TAB+count expands back into
/// spaces, NUL padding is dropped.
pub fn unpack(src: &[u8]) -> Vec<u8> {
    let mut ans = Vec::new();
    let mut counting = false;
    for c in src {
        if counting {
            for _i in 0..*c {
                ans.push(b' ');
            }
            counting = false;
            continue;
        }
        match *c {
            b'\t' => counting = true,
            b'\r' => ans.push(b'\n'),
            0 => {},
            c => ans.push(c)
        }
    }
    ans
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn pack_compresses_spaces() {
        assert_eq!(pack(b"a  b\n",4),b"a  b\r");
        assert_eq!(pack(b"a    b\n",4),b"a\t\x04b\r");
        assert_eq!(pack(b"    lda #4\n",4),b"\t\x04lda #4\r");
    }
    #[test]
    fn pack_strips_trailing() {
        assert_eq!(pack(b"end   \nnext\n",4),b"end\rnext\r");
    }
    #[test]
    fn pack_expands_host_tabs() {
        // column 1 tab reaches column 4 under tabstop 4
        assert_eq!(pack(b"a\tb\n",4),b"a\t\x03b\r");
        assert_eq!(pack(b"ab\tc\n",8),b"ab\t\x06c\r");
    }
    #[test]
    fn unpack_expands() {
        assert_eq!(unpack(b"a\t\x04b\r"),b"a    b\n");
        assert_eq!(unpack(b"ab\0\0\r"),b"ab\n");
    }
    #[test]
    fn flex_round_trip() {
        // pack(unpack(x)) = x for streams whose space runs align
        let streams: Vec<&[u8]> = vec![
            b"\t\x08lda #4\rend\r",
            b"one two\rthree\t\x10four\r",
            b"a  b\r"
        ];
        for x in streams {
            assert_eq!(pack(&unpack(x),4),x);
        }
    }
}
