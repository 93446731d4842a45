mod encode {
    use nor_logger::record::{Channel, EncoderBlock, ImuBlock, LogRecord};
    use nor_logger::{Error, raw};
    use pretty_assertions::assert_eq;

    pub fn imu_block() -> ImuBlock {
        ImuBlock {
            timestamp: 0x01020304,
            accel: [100, -200, 981],
            gyro: [16, -32, 48],
            mag: [1, 2, 3],
            euler: [5760, 0, -16],
            linear_accel: [-1, -2, -3],
            gravity: [0, 0, 981],
            quaternion: [16384, 0, -8192, 0x7fff],
            temperature: 400,
        }
    }

    #[test]
    fn encoder_only() {
        let record = LogRecord {
            encoder: Some(EncoderBlock {
                timestamp: 12345,
                enc1: 100,
                enc2: -50,
            }),
            imu: None,
        };

        let mut buf = [0u8; 16];
        let len = record.encode(&mut buf).unwrap();

        assert_eq!(len, 9);
        assert_eq!(
            &buf[..len],
            &[0x01, 0x39, 0x30, 0x00, 0x00, 0x64, 0x00, 0xCE, 0xFF]
        );
        assert_eq!(&*record.to_bytes(), &buf[..len]);
    }

    #[test]
    fn lengths() {
        let encoder = Some(EncoderBlock::default());
        let imu = Some(imu_block());

        let lengths = [
            LogRecord::default().encoded_len(),
            LogRecord { encoder, imu: None }.encoded_len(),
            LogRecord { encoder: None, imu }.encoded_len(),
            LogRecord { encoder, imu }.encoded_len(),
        ];
        assert_eq!(lengths, [1, 9, 51, 59]);
        assert_eq!(raw::MAX_RECORD_LEN, 59);
    }

    #[test]
    fn imu_field_order() {
        let record = LogRecord {
            encoder: None,
            imu: Some(imu_block()),
        };
        let bytes = record.to_bytes();

        assert_eq!(bytes[0], raw::FLAG_IMU);
        assert_eq!(&bytes[1..5], &[0x04, 0x03, 0x02, 0x01]);
        // accel x
        assert_eq!(&bytes[5..7], &100i16.to_le_bytes());
        // quaternion w follows six vectors
        assert_eq!(&bytes[5 + 36..5 + 38], &16384i16.to_le_bytes());
        // temperature is last
        assert_eq!(&bytes[49..51], &400i16.to_le_bytes());
    }

    #[test]
    fn buffer_too_small() {
        let record = LogRecord {
            encoder: Some(EncoderBlock::default()),
            imu: None,
        };
        let mut buf = [0u8; 8];
        assert_eq!(record.encode(&mut buf), Err(Error::BufferTooSmall));
    }

    #[test]
    fn channel_widths_cover_block() {
        let samples: usize = Channel::FIELD_ORDER.iter().map(|c| c.width()).sum();
        assert_eq!(samples, raw::IMU_SAMPLES);
    }
}

mod decode {
    use super::encode::imu_block;
    use nor_logger::record::{EncoderBlock, LogRecord};
    use nor_logger::Error;
    use pretty_assertions::assert_eq;

    #[test]
    fn roundtrip_all_combinations() {
        let encoder = Some(EncoderBlock {
            timestamp: u32::MAX - 1,
            enc1: i16::MIN,
            enc2: i16::MAX,
        });
        let imu = Some(imu_block());

        for record in [
            LogRecord::default(),
            LogRecord { encoder, imu: None },
            LogRecord { encoder: None, imu },
            LogRecord { encoder, imu },
        ] {
            let bytes = record.to_bytes();
            let (decoded, used) = LogRecord::decode(&bytes).unwrap();
            assert_eq!(decoded, record);
            assert_eq!(used, bytes.len());
        }
    }

    #[test]
    fn trailing_bytes_are_ignored() {
        let mut buf = vec![0x01, 0x39, 0x30, 0x00, 0x00, 0x64, 0x00, 0xCE, 0xFF];
        buf.extend_from_slice(&[0xFF; 10]);

        let (record, used) = LogRecord::decode(&buf).unwrap();
        assert_eq!(used, 9);
        assert_eq!(
            record.encoder,
            Some(EncoderBlock {
                timestamp: 12345,
                enc1: 100,
                enc2: -50
            })
        );
    }

    #[test]
    fn sentinel() {
        assert_eq!(LogRecord::decode(&[0xFF, 0, 0]), Err(Error::EndOfLog));
        assert_eq!(LogRecord::decode(&[]), Err(Error::EndOfLog));
    }

    #[test]
    fn invalid_flags() {
        assert_eq!(LogRecord::decode(&[0x04]), Err(Error::InvalidFlags(0x04)));
        assert_eq!(LogRecord::decode(&[0x83]), Err(Error::InvalidFlags(0x83)));
    }

    #[test]
    fn truncated() {
        let record = LogRecord {
            encoder: Some(EncoderBlock::default()),
            imu: Some(imu_block()),
        };
        let bytes = record.to_bytes();

        for len in 1..bytes.len() {
            assert_eq!(
                LogRecord::decode(&bytes[..len]),
                Err(Error::TruncatedRecord),
                "len {len}"
            );
        }
    }

    #[test]
    fn payload_may_contain_ff() {
        let record = LogRecord {
            encoder: Some(EncoderBlock {
                timestamp: u32::MAX,
                enc1: -1,
                enc2: -1,
            }),
            imu: None,
        };
        let bytes = record.to_bytes();
        assert_eq!(&bytes[1..], &[0xFF; 8]);
        assert_eq!(LogRecord::decode(&bytes).unwrap().0, record);
    }
}

mod physical {
    use super::encode::imu_block;
    use nor_logger::record::{Channel, LogRecord};
    use pretty_assertions::assert_eq;

    #[test]
    fn scale_table() {
        assert_eq!(Channel::Gyro.to_physical(32), 2.0);
        assert_eq!(Channel::Euler.to_physical(5760), 360.0);
        assert_eq!(Channel::Mag.to_physical(-16), -1.0);
        assert_eq!(Channel::Accel.to_physical(981), 9.81);
        assert_eq!(Channel::LinearAccel.to_physical(-50), -0.5);
        assert_eq!(Channel::Gravity.to_physical(100), 1.0);
        assert_eq!(Channel::Quaternion.to_physical(16384), 1.0);
        assert_eq!(Channel::Temperature.to_physical(400), 25.0);
    }

    #[test]
    fn record_conversion() {
        let record = LogRecord {
            encoder: None,
            imu: Some(imu_block()),
        };
        let physical = record.to_physical();
        let imu = physical.imu.unwrap();

        assert_eq!(physical.encoder, None);
        assert_eq!(imu.timestamp, 0x01020304);
        assert_eq!(imu.accel, [1.0, -2.0, 9.81]);
        assert_eq!(imu.gyro, [1.0, -2.0, 3.0]);
        assert_eq!(imu.euler, [360.0, 0.0, -1.0]);
        assert_eq!(imu.quaternion, [1.0, 0.0, -0.5, 32767.0 / 16384.0]);
        assert_eq!(imu.temperature, 25.0);
    }

    #[test]
    fn labels() {
        let labels: Vec<&'static str> = Channel::FIELD_ORDER.iter().map(|&c| c.into()).collect();
        assert_eq!(
            labels,
            ["Accel", "Gyro", "Magnet", "Euler", "LinAccel", "Gravity", "Quaternion", "Temp"]
        );
        assert_eq!(Channel::LinearAccel.to_string(), "LinAccel");
    }
}
