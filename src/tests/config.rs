use crate::config::{ConfigError, Configuration, VALID_TX_DATA_LENGTHS};

#[test]
fn test_default_configuration_is_valid() {
    let config = Configuration::default();

    assert!(config.validate().is_ok());
    assert_eq!(0, config.stmin);
    assert_eq!(8, config.blocksize);
    assert_eq!(1000, config.rx_flowcontrol_timeout);
    assert_eq!(1000, config.rx_consecutive_frame_timeout);
    assert_eq!(None, config.tx_padding);
    assert_eq!(0, config.wftmax);
    assert_eq!(8, config.tx_data_length);
    assert_eq!(4095, config.max_frame_size);
    assert!(!config.can_fd);
}

#[test]
fn test_tx_data_length_validation() {
    for tx_data_length in VALID_TX_DATA_LENGTHS {
        let config = Configuration {
            tx_data_length,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    for tx_data_length in [0, 7, 9, 10, 63, 65, 255] {
        let config = Configuration {
            tx_data_length,
            ..Default::default()
        };
        assert_eq!(Err(ConfigError::InvalidTxDataLength(tx_data_length)), config.validate());
    }
}
