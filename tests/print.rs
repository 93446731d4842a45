mod common;

mod text {
    use nor_logger::print::write_human;
    use nor_logger::record::{EncoderBlock, ImuBlock, LogRecord};
    use pretty_assertions::assert_eq;

    pub fn record() -> LogRecord {
        LogRecord {
            encoder: Some(EncoderBlock {
                timestamp: 12345,
                enc1: 100,
                enc2: -50,
            }),
            imu: Some(ImuBlock {
                timestamp: 12400,
                accel: [100, 200, -981],
                gyro: [16, 0, -8],
                mag: [320, -160, 48],
                euler: [5760, 0, 0],
                linear_accel: [1, -1, 0],
                gravity: [0, 0, 981],
                quaternion: [16384, 0, -8192, 4096],
                temperature: 400,
            }),
        }
    }

    #[test]
    fn full_record() {
        let mut out = String::new();
        write_human(&mut out, 3, &record()).unwrap();

        assert_eq!(
            out,
            "Sample 3:\n\
             \x20 Encoder:    ts=12345 enc1=100 enc2=-50\n\
             \x20 IMU ts:     12400\n\
             \x20 Accel:      1.00 2.00 -9.81\n\
             \x20 Gyro:       1.00 0.00 -0.50\n\
             \x20 Magnet:     20.00 -10.00 3.00\n\
             \x20 Euler:      360.00 0.00 0.00\n\
             \x20 LinAccel:   0.01 -0.01 0.00\n\
             \x20 Gravity:    0.00 0.00 9.81\n\
             \x20 Quaternion: 1.0000 0.0000 -0.5000 0.2500\n\
             \x20 Temp:       25.00 C\n"
        );
    }

    #[test]
    fn encoder_only() {
        let record = LogRecord {
            imu: None,
            ..record()
        };
        let mut out = String::new();
        write_human(&mut out, 0, &record).unwrap();

        assert_eq!(out, "Sample 0:\n  Encoder:    ts=12345 enc1=100 enc2=-50\n");
    }
}

mod csv {
    use super::text::record;
    use nor_logger::print::{write_csv_header, write_csv_row};
    use nor_logger::record::LogRecord;
    use pretty_assertions::assert_eq;

    #[test]
    fn header() {
        let mut out = String::new();
        write_csv_header(&mut out).unwrap();

        assert_eq!(
            out,
            "index,enc_ts,enc1,enc2,imu_ts,\
             acc_x,acc_y,acc_z,gyr_x,gyr_y,gyr_z,mag_x,mag_y,mag_z,\
             eul_x,eul_y,eul_z,lin_x,lin_y,lin_z,grav_x,grav_y,grav_z,\
             quat_w,quat_x,quat_y,quat_z,temp\n"
        );
    }

    #[test]
    fn rows_match_header() {
        let mut header = String::new();
        write_csv_header(&mut header).unwrap();
        let columns = header.trim_end().split(',').count();

        for record in [
            record(),
            LogRecord {
                imu: None,
                ..record()
            },
            LogRecord {
                encoder: None,
                ..record()
            },
            LogRecord::default(),
        ] {
            let mut row = String::new();
            write_csv_row(&mut row, 0, &record).unwrap();
            assert_eq!(row.trim_end().split(',').count(), columns, "{row}");
        }
    }

    #[test]
    fn full_row() {
        let mut out = String::new();
        write_csv_row(&mut out, 1, &record()).unwrap();

        assert_eq!(
            out,
            "1,12345,100,-50,12400,\
             1.00,2.00,-9.81,1.00,0.00,-0.50,20.00,-10.00,3.00,\
             360.00,0.00,0.00,0.01,-0.01,0.00,0.00,0.00,9.81,\
             1.0000,0.0000,-0.5000,0.2500,25.00\n"
        );
    }

    #[test]
    fn imu_only_row() {
        let record = LogRecord {
            encoder: None,
            ..record()
        };
        let mut out = String::new();
        write_csv_row(&mut out, 2, &record).unwrap();

        assert!(out.starts_with("2,,,,12400,1.00,"));
    }
}

mod dump {
    use super::text::record;
    use crate::common;
    use nor_logger::print::{self, Format};
    use nor_logger::record::LogRecord;
    use nor_logger::{AppendLog, Geometry};
    use pretty_assertions::assert_eq;

    #[test]
    fn formats_parse() {
        assert_eq!("text".parse(), Ok(Format::Text));
        assert_eq!("CSV".parse(), Ok(Format::Csv));
        assert!("json".parse::<Format>().is_err());
        assert_eq!(Format::Csv.to_string(), "csv");
    }

    #[test]
    fn text_dump() {
        let mut flash = common::Flash::new(1);
        let mut log = AppendLog::new(&mut flash, Geometry::new(0, 0x1000).unwrap()).unwrap();
        log.append_record(&record()).unwrap();
        log.append_record(&LogRecord::default()).unwrap();

        let mut out = String::new();
        assert_eq!(print::dump(&mut log, &mut out, Format::Text), Ok(2));
        assert!(out.contains("Sample 0:\n  Encoder:"));
        assert!(out.contains("Sample 1:\n"));
        assert!(out.ends_with("2 samples\n"));
    }

    #[test]
    fn truncated_dump_names_address() {
        let mut flash = common::Flash::new(1);
        let mut log = AppendLog::new(&mut flash, Geometry::new(0, 0x1000).unwrap()).unwrap();
        log.append_record(&record()).unwrap();
        log.append(&[0x10]).unwrap();

        let mut out = String::new();
        assert_eq!(print::dump(&mut log, &mut out, Format::Text), Ok(1));
        assert!(out.contains("Log truncated at 0x00003b\n"), "{out}");
    }

    #[test]
    fn csv_dump() {
        let mut flash = common::Flash::new(1);
        let mut log = AppendLog::new(&mut flash, Geometry::new(0, 0x1000).unwrap()).unwrap();
        for _ in 0..3 {
            log.append_record(&record()).unwrap();
        }

        let mut out = String::new();
        assert_eq!(print::dump(&mut log, &mut out, Format::Csv), Ok(3));
        assert_eq!(out.lines().count(), 4);
        assert!(out.starts_with("index,"));
    }
}
