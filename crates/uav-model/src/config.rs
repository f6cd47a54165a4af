use serde::Deserialize;

/// One airframe row from the fleet config table.
///
/// Column names follow the deployed CSV layout: the data-plane port is
/// published as `mavlink_port` and the bridge control port as `debug_port`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DroneConfig {
    pub hw_id: u32,
    pub pos_id: u32,
    pub x: f64,
    pub y: f64,
    pub ip: String,
    #[serde(rename = "mavlink_port")]
    pub command_port: u16,
    #[serde(rename = "debug_port")]
    pub control_port: u16,
    #[serde(rename = "gcs_ip")]
    pub ground_station_ip: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
hw_id,pos_id,x,y,ip,mavlink_port,debug_port,gcs_ip
1,1,0.0,0.0,10.0.0.11,14541,50041,10.0.0.1
2,4,1.5,-2.0,10.0.0.12,14542,50042,10.0.0.1
";

    #[test]
    fn deserializes_rows() {
        let mut reader = csv::Reader::from_reader(SAMPLE.as_bytes());
        let rows: Vec<DroneConfig> = reader
            .deserialize()
            .collect::<Result<_, _>>()
            .expect("sample rows parse");

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].hw_id, 1);
        assert_eq!(rows[0].command_port, 14541);
        assert_eq!(rows[0].control_port, 50041);
        assert_eq!(rows[1].pos_id, 4);
        assert_eq!(rows[1].x, 1.5);
        assert_eq!(rows[1].ground_station_ip, "10.0.0.1");
    }
}
