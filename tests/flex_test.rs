// test of the FLEX sector-graph engine against freshly formatted images
use chrono::NaiveDate;
use flexkit::fs::flex;
use flexkit::fs::flex::types::{FileFlags,Finding,Owner,Ts};
use flexkit::img::SECTOR_SIZE;

fn test_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026,8,1).expect("bad date")
}

/// 40 track, 10 sector, single density image with label TEST and volume 42
fn blank_image() -> flexkit::img::Img {
    flex::format_img("TEST",42,40,10,10,test_date()).expect("format failed")
}

fn parsed_session(img: flexkit::img::Img) -> flex::Session {
    let mut sess = flex::Session::from_img(img).expect("not a FLEX image");
    sess.parse().expect("parse failed");
    sess
}

#[test]
fn format_sir_bytes() {
    let dat = blank_image().to_bytes();
    assert_eq!(dat.len(),400*SECTOR_SIZE);
    assert_eq!(&dat[0x210..0x21B],b"TEST       ");
    assert_eq!(&dat[0x21B..0x21D],&[0x00,0x2A]);
    assert_eq!(&dat[0x21D..0x21F],&[0x01,0x01]);
    assert_eq!(&dat[0x21F..0x221],&[0x27,0x0A]);
    assert_eq!(&dat[0x221..0x223],&[0x01,0x86]);
    assert_eq!(&dat[0x223..0x226],&[8,1,26]);
    assert_eq!(&dat[0x226..0x228],&[0x27,0x0A]);
    // directory chain on track 0 runs from sector 5 to sector 10
    assert_eq!(&dat[4*SECTOR_SIZE..4*SECTOR_SIZE+2],&[0,6]);
    assert_eq!(&dat[9*SECTOR_SIZE..9*SECTOR_SIZE+2],&[0,0]);
    // first and last free sectors
    assert_eq!(&dat[10*SECTOR_SIZE..10*SECTOR_SIZE+2],&[1,2]);
    assert_eq!(&dat[399*SECTOR_SIZE..399*SECTOR_SIZE+2],&[0,0]);
}

#[test]
fn format_parses_clean() {
    let sess = parsed_session(blank_image());
    assert_eq!(sess.status(),0);
    assert_eq!(sess.findings().len(),0);
    assert_eq!(sess.files().len(),0);
    assert_eq!(sess.label(),"TEST");
    assert_eq!(sess.sir().free_count,390);
    // free count agrees with the ownership map
    let free = sess.owners().iter().filter(|o| **o==Owner::Free).count();
    assert_eq!(free,390);
    // reserved blocks and the directory are where they belong
    for b in 0..4 {
        assert_eq!(sess.owners()[b],Owner::Boot);
    }
    for b in 4..10 {
        assert_eq!(sess.owners()[b],Owner::Directory);
    }
    // every block has exactly one owner and none are unclaimed
    assert!(!sess.owners().iter().any(|o| *o==Owner::Unclaimed));
}

#[test]
fn insert_file() {
    let mut sess = parsed_session(blank_image());
    let dat = vec![0x55;500];
    let name = sess.put_file("a.txt",&dat,test_date()).expect("put failed");
    assert_eq!(name,"a.txt");
    assert_eq!(sess.sir().free_count,388);
    assert_eq!(sess.sir().free_head,Ts::new(1,3));
    let rec = &sess.files()[0];
    assert_eq!(rec.start,Ts::new(1,1));
    assert_eq!(rec.end,Ts::new(1,2));
    assert_eq!(rec.length,2);
    let bytes = sess.img().to_bytes();
    // directory slot 0
    let slot = 4*SECTOR_SIZE + 16;
    assert_eq!(&bytes[slot..slot+11],b"a       txt");
    assert_eq!(&bytes[slot+0x0d..slot+0x11],&[1,1,1,2]);
    assert_eq!(&bytes[slot+0x11..slot+0x13],&[0,2]);
    assert_eq!(&bytes[slot+0x15..slot+0x18],&[8,1,26]);
    // first data sector keeps its link, gains a record number and payload
    let sec1 = 10*SECTOR_SIZE;
    assert_eq!(&bytes[sec1..sec1+4],&[1,2,0,1]);
    assert!(bytes[sec1+4..sec1+256].iter().all(|b| *b==0x55));
    // last data sector is cut from the chain and zero padded
    let sec2 = 11*SECTOR_SIZE;
    assert_eq!(&bytes[sec2..sec2+4],&[0,0,0,2]);
    assert!(bytes[sec2+4..sec2+252].iter().all(|b| *b==0x55));
    assert!(bytes[sec2+252..sec2+256].iter().all(|b| *b==0));
    // the image must still parse clean
    let sess = parsed_session(flexkit::img::Img::from_bytes(&bytes).expect("bad image"));
    assert_eq!(sess.status(),0);
    assert_eq!(sess.files().len(),1);
    assert_eq!(sess.files()[0].name,"a.txt");
}

#[test]
fn insert_rejects_duplicates_and_overflow() {
    let mut sess = parsed_session(blank_image());
    sess.put_file("a.txt",&[1,2,3],test_date()).expect("put failed");
    assert!(sess.put_file("a.txt",&[4,5,6],test_date()).is_err());
    assert!(sess.put_file("big.bin",&vec![0;400*252],test_date()).is_err());
}

#[test]
fn delete_file() {
    let mut sess = parsed_session(blank_image());
    sess.put_file("a.txt",&vec![0x55;500],test_date()).expect("put failed");
    sess.delete_file("a.txt").expect("delete failed");
    assert_eq!(sess.sir().free_count,390);
    assert_eq!(sess.sir().free_tail,Ts::new(1,2));
    let bytes = sess.img().to_bytes();
    let slot = 4*SECTOR_SIZE + 16;
    assert_eq!(bytes[slot],0xFF);
    assert_eq!(&bytes[slot+1..slot+11],b"       txt");
    // the old free tail now links to the file's former start
    assert_eq!(&bytes[399*SECTOR_SIZE..399*SECTOR_SIZE+2],&[1,1]);
}

#[test]
fn deleted_entry_is_recoverable() {
    let mut sess = parsed_session(blank_image());
    let dat: Vec<u8> = (0..500).map(|i| (i%251) as u8).collect();
    sess.put_file("a.txt",&dat,test_date()).expect("put failed");
    sess.delete_file("a.txt").expect("delete failed");
    let sess = parsed_session(flexkit::img::Img::from_bytes(&sess.img().bytes()).expect("bad image"));
    assert_eq!(sess.status(),0);
    let rec = &sess.files()[0];
    assert_eq!(rec.name,"?.txt");
    assert!(rec.flags.contains(FileFlags::DELETED));
    assert!(rec.flags.contains(FileFlags::RECOVERABLE));
    let (back,truncated) = sess.read_file(0).expect("read failed");
    assert!(!truncated);
    assert_eq!(&back[0..500],&dat[0..]);
}

#[test]
fn recoverability_lost_when_chain_reused() {
    let mut sess = parsed_session(blank_image());
    sess.put_file("a.txt",&vec![0x55;500],test_date()).expect("put failed");
    sess.delete_file("a.txt").expect("delete failed");
    // consume the whole free chain, including the deleted file's sectors
    sess.put_file("c.bin",&vec![0xAA;390*252],test_date()).expect("put failed");
    let sess = parsed_session(flexkit::img::Img::from_bytes(&sess.img().bytes()).expect("bad image"));
    let rec = sess.files().iter().find(|f| f.name=="?.txt").expect("deleted entry lost");
    assert!(rec.flags.contains(FileFlags::DELETED));
    assert!(!rec.flags.contains(FileFlags::RECOVERABLE));
}

#[test]
fn insert_delete_repair_round_trip() {
    let before = blank_image().to_bytes();
    let mut sess = parsed_session(flexkit::img::Img::from_bytes(&before).expect("bad image"));
    sess.put_file("a.txt",&vec![0;500],test_date()).expect("put failed");
    sess.delete_file("a.txt").expect("delete failed");
    let report = sess.repair().expect("repair failed");
    assert_eq!(report.free_count,390);
    assert_eq!(report.compacted,1);
    let after = sess.img().to_bytes();
    // byte equivalence except the record numbers left in the two sectors
    // the file passed through (the directory slot was compacted to zero)
    let exempt = [10*SECTOR_SIZE+2,10*SECTOR_SIZE+3,11*SECTOR_SIZE+2,11*SECTOR_SIZE+3];
    for i in 0..before.len() {
        if exempt.contains(&i) {
            continue;
        }
        assert_eq!(before[i],after[i],"mismatch at offset {:#x}",i);
    }
    let sess = parsed_session(flexkit::img::Img::from_bytes(&after).expect("bad image"));
    assert_eq!(sess.status(),0);
    assert_eq!(sess.files().len(),0);
}

#[test]
fn broken_freelist_is_repaired() {
    let mut bytes = blank_image().to_bytes();
    // cut the chain after 95 sectors, stranding the rest
    let cut = (10+94)*SECTOR_SIZE;
    bytes[cut] = 0;
    bytes[cut+1] = 0;
    let mut sess = parsed_session(flexkit::img::Img::from_bytes(&bytes).expect("bad image"));
    assert_eq!(sess.status(),1);
    assert!(sess.findings().iter().any(|f| matches!(f,
        Finding::FreelistLengthMismatch { walked: 95, declared: 390 })));
    assert!(sess.findings().iter().any(|f| matches!(f,Finding::UnclaimedSectors(295))));
    let report = sess.repair().expect("repair failed");
    assert_eq!(report.reclaimed,295);
    assert_eq!(report.free_count,390);
    assert!(report.modifications >= 1);
    let sess = parsed_session(flexkit::img::Img::from_bytes(&sess.img().bytes()).expect("bad image"));
    assert_eq!(sess.status(),0);
    assert_eq!(sess.sir().free_count,390);
    // ascending order: every free sector links to the next block
    assert_eq!(&sess.img().bytes()[10*SECTOR_SIZE..10*SECTOR_SIZE+2],&[1,2]);
}

#[test]
fn free_count_off_by_one() {
    let mut bytes = blank_image().to_bytes();
    bytes[0x222] = 0x85;
    let mut sess = parsed_session(flexkit::img::Img::from_bytes(&bytes).expect("bad image"));
    assert_eq!(sess.status(),1);
    assert!(sess.findings().iter().any(|f| matches!(f,
        Finding::FreelistLengthMismatch { walked: 389, declared: 389 })));
    assert!(sess.findings().iter().any(|f| matches!(f,Finding::UnclaimedSectors(1))));
    let report = sess.repair().expect("repair failed");
    assert_eq!(report.free_count,390);
    let sess = parsed_session(flexkit::img::Img::from_bytes(&sess.img().bytes()).expect("bad image"));
    assert_eq!(sess.status(),0);
}

#[test]
fn sector_duplicated_in_freelist() {
    let mut bytes = blank_image().to_bytes();
    // make the second free sector link back to the first
    let sec = 11*SECTOR_SIZE;
    bytes[sec] = 1;
    bytes[sec+1] = 1;
    let sess = parsed_session(flexkit::img::Img::from_bytes(&bytes).expect("bad image"));
    assert_eq!(sess.status(),1);
    assert!(sess.findings().iter().any(|f| matches!(f,Finding::FreelistDuplicate(_,_))));
}

#[test]
fn file_crossing_directory_is_fatal_for_the_file() {
    let mut sess = parsed_session(blank_image());
    sess.put_file("a.bin",&vec![0x11;600],test_date()).expect("put failed");
    let mut bytes = sess.img().to_bytes();
    // second sector of the file now links into the directory chain
    let sec = 11*SECTOR_SIZE;
    bytes[sec] = 0;
    bytes[sec+1] = 5;
    let mut sess = parsed_session(flexkit::img::Img::from_bytes(&bytes).expect("bad image"));
    assert_eq!(sess.status(),2);
    assert!(sess.findings().iter().any(|f| matches!(f,Finding::FileDirOverlap {..})));
    assert!(sess.files()[0].flags.contains(FileFlags::CORRUPTED));
    assert!(sess.repair().is_err());
    assert!(sess.put_file("b.bin",&[1,2,3],test_date()).is_err());
}

#[test]
fn directory_loop_aborts_parse() {
    let mut bytes = blank_image().to_bytes();
    // first directory sector links to itself
    bytes[4*SECTOR_SIZE] = 0;
    bytes[4*SECTOR_SIZE+1] = 5;
    let mut sess = flex::Session::from_img(flexkit::img::Img::from_bytes(&bytes).expect("bad image")).expect("not FLEX");
    sess.parse().expect("parse failed");
    assert_eq!(sess.status(),2);
    assert!(sess.findings().iter().any(|f| matches!(f,Finding::DirectoryLoop(_))));
    assert!(sess.put_file("a.txt",&[1],test_date()).is_err());
}

#[test]
fn entry_starting_in_reserved_blocks() {
    let mut bytes = blank_image().to_bytes();
    let slot = 4*SECTOR_SIZE + 16;
    bytes[slot..slot+11].copy_from_slice(b"BAD     BIN");
    bytes[slot+0x0d] = 0;
    bytes[slot+0x0e] = 1;
    bytes[slot+0x12] = 1;
    let sess = parsed_session(flexkit::img::Img::from_bytes(&bytes).expect("bad image"));
    assert_eq!(sess.status(),2);
    assert!(sess.findings().iter().any(|f| matches!(f,Finding::BadStart {..})));
    assert!(sess.files()[0].flags.contains(FileFlags::CORRUPTED));
}

#[test]
fn zero_length_entry_counts_as_deleted() {
    let mut bytes = blank_image().to_bytes();
    let slot = 4*SECTOR_SIZE + 16;
    bytes[slot..slot+11].copy_from_slice(b"B       BIN");
    let sess = parsed_session(flexkit::img::Img::from_bytes(&bytes).expect("bad image"));
    assert_eq!(sess.status(),0);
    assert!(sess.files()[0].flags.contains(FileFlags::DELETED));
    assert_eq!(sess.deleted_count(),1);
}

#[test]
fn bad_name_is_a_warning() {
    let mut bytes = blank_image().to_bytes();
    let slot = 4*SECTOR_SIZE + 16;
    bytes[slot..slot+11].copy_from_slice(b"A B     TXT");
    let sess = parsed_session(flexkit::img::Img::from_bytes(&bytes).expect("bad image"));
    assert_eq!(sess.status(),1);
    assert!(sess.findings().iter().any(|f| matches!(f,Finding::BadName(1))));
    assert!(sess.files()[0].flags.contains(FileFlags::BAD_NAME));
}

#[test]
fn random_access_file() {
    let mut sess = parsed_session(blank_image());
    let mut dat = b"#FLEX##RAND#".to_vec();
    dat.extend((0..988).map(|i| (i%249) as u8));
    sess.put_file("table.rnd",&dat,test_date()).expect("put failed");
    let rec = &sess.files()[0];
    assert!(rec.flags.contains(FileFlags::RANDOM));
    assert_eq!(rec.length,4);
    let bytes = sess.img().to_bytes();
    // directory entry carries the random flag
    let slot = 4*SECTOR_SIZE + 16;
    assert_eq!(bytes[slot+0x13],2);
    // the magic never reaches the disk
    assert_eq!(&bytes[10*SECTOR_SIZE+4..10*SECTOR_SIZE+7],&[1,3,2]);
    // index sectors carry no record numbers, data sectors count from 1
    assert_eq!(&bytes[10*SECTOR_SIZE+2..10*SECTOR_SIZE+4],&[0,0]);
    assert_eq!(&bytes[11*SECTOR_SIZE+2..11*SECTOR_SIZE+4],&[0,0]);
    assert_eq!(&bytes[12*SECTOR_SIZE+2..12*SECTOR_SIZE+4],&[0,1]);
    assert_eq!(&bytes[13*SECTOR_SIZE+2..13*SECTOR_SIZE+4],&[0,2]);
    // reading it back reproduces the host stream, sector padded
    let (back,truncated) = sess.read_file(0).expect("read failed");
    assert!(!truncated);
    assert_eq!(&back[0..dat.len()],&dat[0..]);
    assert!(back[dat.len()..].iter().all(|b| *b==0));
}

#[test]
fn foreign_images_are_refused() {
    // an OS-9 image declares its own sector count up front
    let mut bytes = vec![0u8;400*SECTOR_SIZE];
    bytes[1] = 1;
    bytes[2] = 0x90;
    match flexkit::create_session_from_bytestream(&bytes) {
        Err(e) => assert!(e.to_string().contains("OS-9")),
        Ok(_) => panic!("accepted an OS-9 image")
    }
    // something with no recognizable structure at all
    let bytes = vec![0u8;400*SECTOR_SIZE];
    match flexkit::create_session_from_bytestream(&bytes) {
        Err(e) => assert!(e.to_string().contains("unknown")),
        Ok(_) => panic!("accepted an empty image")
    }
}

#[test]
fn sir_free_count_beyond_disk_is_refused() {
    let mut bytes = blank_image().to_bytes();
    bytes[0x221] = 0xFF;
    bytes[0x222] = 0xFF;
    match flexkit::create_session_from_bytestream(&bytes) {
        Err(e) => assert!(e.to_string().contains("SIR")),
        Ok(_) => panic!("accepted a corrupt SIR")
    }
}
