use rtmp_amf0::{deserialize, read_string, serialize, Amf0Value};
use rtmp_client::session::{RtmpSession, SessionConfig};
use rtmp_client::transport::TcpTransport;
use std::env;
use std::io::Cursor;
use std::thread;
use std::time::{Duration, Instant};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use url::Url;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

fn main() {
    let mut args: Vec<String> = env::args().collect();
    args.drain(0..1); // remove the executable

    if args.is_empty() {
        println!("No arguments provided.  The following must be provided");
        println!("rtmp-probe <rtmp url> [seconds to listen]");
        return;
    }

    if let Err(x) = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .try_init()
    {
        println!("Could not install log output: {}", x);
    }

    let url = &args[0];
    let seconds = match args.get(1) {
        Some(x) => match x.parse::<u64>() {
            Ok(seconds) => seconds,
            Err(_) => {
                println!("'{}' is not a number of seconds", x);
                return;
            }
        },
        None => 10,
    };

    probe(url, Duration::from_secs(seconds));
}

fn probe(url: &str, listen_for: Duration) {
    let mut session = RtmpSession::new(TcpTransport::new(), SessionConfig::new());
    if let Err(x) = session.connect(url) {
        println!("Connection to {} failed: {}", url, x);
        return;
    }

    let started_at = Instant::now();
    let mut connect_sent = false;

    while started_at.elapsed() < listen_for {
        session.update();
        if session.error() {
            println!("Session failed");
            break;
        }

        if session.connected() && !connect_sent {
            println!("Handshaking Completed!");
            match connect_request(url).map(|x| session.call(&x)) {
                Some(Ok(())) => println!("Sent connect request"),
                Some(Err(x)) => println!("Failed to send connect request: {}", x),
                None => println!("Failed to encode connect request"),
            }

            connect_sent = true;
        }

        while let Some(message) = session.get_message() {
            println!("Received {}", describe_message(message.payload().unwrap_or(&[])));
        }

        while let Some(frame) = session.get_flv_frame() {
            println!("FLV frame of {} bytes", frame.payload_size());
        }

        thread::sleep(POLL_INTERVAL);
    }

    session.close();
}

/// Builds the `connect` invoke for the application named by the url's first path segment
fn connect_request(url: &str) -> Option<Vec<u8>> {
    let parsed = Url::parse(url).ok()?;
    let app = parsed
        .path_segments()
        .and_then(|mut x| x.next())
        .unwrap_or("");

    let command_object = Amf0Value::Object(vec![
        ("app".to_string(), Amf0Value::Utf8String(app.to_string())),
        ("flashVer".to_string(), Amf0Value::Utf8String("LNX 10,0,22,87".to_string())),
        ("tcUrl".to_string(), Amf0Value::Utf8String(url.to_string())),
        ("fpad".to_string(), Amf0Value::Boolean(false)),
        ("capabilities".to_string(), Amf0Value::Number(15.0)),
        ("audioCodecs".to_string(), Amf0Value::Number(3191.0)),
        ("videoCodecs".to_string(), Amf0Value::Number(252.0)),
        ("videoFunction".to_string(), Amf0Value::Number(1.0)),
    ]);

    serialize(&[
        Amf0Value::Utf8String("connect".to_string()),
        Amf0Value::Number(1.0),
        command_object,
    ])
    .ok()
}

/// Summarises an invoke: its method, its transaction id and the status code it carries, if any
fn describe_message(payload: &[u8]) -> String {
    let method = match read_string(payload) {
        Ok(method) => method,
        Err(x) => return format!("message without a method name: {}", x),
    };

    let values = match deserialize(&mut Cursor::new(payload)) {
        Ok(values) => values,
        Err(x) => return format!("{} with undecodable arguments: {}", method, x),
    };

    let mut arguments = values.into_iter().skip(1);
    let transaction_id = arguments.next().and_then(Amf0Value::get_number);
    let status = arguments.find_map(|x| {
        let code = x.property("code").cloned().and_then(Amf0Value::get_string)?;
        match x.property("description").cloned().and_then(Amf0Value::get_string) {
            Some(description) => Some(format!("{} ({})", code, description)),
            None => Some(code),
        }
    });

    let mut summary = method;
    if let Some(id) = transaction_id {
        summary.push_str(&format!(" #{}", id));
    }

    if let Some(status) = status {
        summary.push_str(&format!(": {}", status));
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    fn string(value: &str) -> Amf0Value {
        Amf0Value::Utf8String(value.to_string())
    }

    #[test]
    fn connect_request_names_app_from_first_path_segment() {
        let payload = connect_request("rtmp://localhost:1935/live/stream").unwrap();
        let values = deserialize(&mut Cursor::new(&payload)).unwrap();

        assert_eq!(values[0], string("connect"));
        assert_eq!(values[2].property("app"), Some(&string("live")));
        assert_eq!(values[2].property("tcUrl"), Some(&string("rtmp://localhost:1935/live/stream")));
    }

    #[test]
    fn connect_request_without_path_has_empty_app() {
        let payload = connect_request("rtmp://localhost").unwrap();
        let values = deserialize(&mut Cursor::new(&payload)).unwrap();

        assert_eq!(values[2].property("app"), Some(&string("")));
    }

    #[test]
    fn result_is_described_with_transaction_and_status_code() {
        let info = Amf0Value::Object(vec![
            ("level".to_string(), string("status")),
            ("code".to_string(), string("NetConnection.Connect.Success")),
            ("description".to_string(), string("Connection succeeded.")),
        ]);

        let payload = serialize(&[string("_result"), Amf0Value::Number(1.0), Amf0Value::Null, info]).unwrap();

        assert_eq!(
            describe_message(&payload),
            "_result #1: NetConnection.Connect.Success (Connection succeeded.)"
        );
    }

    #[test]
    fn call_without_status_is_described_by_method_and_transaction() {
        let payload = serialize(&[string("onBWDone"), Amf0Value::Number(0.0), Amf0Value::Null]).unwrap();

        assert_eq!(describe_message(&payload), "onBWDone #0");
    }

    #[test]
    fn payload_without_method_name_is_reported() {
        let payload = serialize(&[Amf0Value::Number(3.0)]).unwrap();

        assert!(describe_message(&payload).starts_with("message without a method name"));
    }
}
