use super::*;
use crate::error::Error;

#[test]
fn test_new_sdp_type() {
    let tests = vec![
        ("Unspecified", RTCSdpType::Unspecified),
        ("offer", RTCSdpType::Offer),
        ("pranswer", RTCSdpType::Pranswer),
        ("answer", RTCSdpType::Answer),
        ("rollback", RTCSdpType::Rollback),
    ];

    for (sdp_type_string, expected_sdp_type) in tests {
        assert_eq!(RTCSdpType::from(sdp_type_string), expected_sdp_type);
    }
}

#[test]
fn test_session_description_json() -> Result<()> {
    let desc = RTCSessionDescription::unmarshal(r#"{"type":"answer","sdp":"v=0\r\n"}"#)?;
    assert_eq!(desc, RTCSessionDescription::answer("v=0\r\n".to_owned()));

    let raw = RTCSessionDescription::offer("v=0".to_owned()).marshal()?;
    assert_eq!(raw, r#"{"type":"offer","sdp":"v=0"}"#);

    Ok(())
}

#[test]
fn test_session_description_unmarshal_invalid() {
    let result = RTCSessionDescription::unmarshal("not json");
    assert!(matches!(result, Err(Error::Json(_))));
}
