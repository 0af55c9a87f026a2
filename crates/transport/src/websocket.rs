//! WebSocket connector for the relay server

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace};

use crate::channel::{ChannelConnector, MessageChannel};
use crate::endpoint::Endpoint;
use crate::error::{Result, TransportError};

/// Connects to `ws://` relay endpoints
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

impl ChannelConnector for WebSocketConnector {
    type Channel = WebSocketChannel;

    async fn connect(&self, endpoint: &Endpoint) -> Result<WebSocketChannel> {
        let url = endpoint.url();
        let (stream, response) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|e| TransportError::connect(&url, e.to_string()))?;
        debug!(endpoint = %url, status = %response.status(), "websocket connected");
        Ok(WebSocketChannel { url, stream })
    }
}

/// One WebSocket connection; every binary message is one relay message
pub struct WebSocketChannel {
    url: String,
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WebSocketChannel {
    fn closed(&self, err: tungstenite::Error) -> TransportError {
        TransportError::closed(&self.url, err.to_string())
    }
}

impl MessageChannel for WebSocketChannel {
    async fn send(&mut self, message: Bytes) -> Result<()> {
        let sent = self.stream.send(Message::Binary(message.to_vec())).await;
        sent.map_err(|e| self.closed(e))
    }

    async fn recv(&mut self) -> Result<Bytes> {
        loop {
            let next = self.stream.next().await;
            match next {
                Some(Ok(Message::Binary(data))) => return Ok(Bytes::from(data)),
                Some(Ok(Message::Text(text))) => return Ok(Bytes::from(text.into_bytes())),
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame
                        .map(|f| f.reason.to_string())
                        .unwrap_or_else(|| "close frame".to_string());
                    return Err(TransportError::closed(&self.url, reason));
                }
                Some(Ok(other)) => trace!(kind = ?other, "ignoring control message"),
                Some(Err(e)) => return Err(self.closed(e)),
                None => return Err(TransportError::closed(&self.url, "stream ended")),
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        let closed = self.stream.close(None).await;
        match closed {
            Ok(()) => Ok(()),
            Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => Ok(()),
            Err(e) => Err(self.closed(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::TransportSession;
    use contracts::StreamRole;
    use tokio::net::TcpListener;
    use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
    use tokio_tungstenite::tungstenite::protocol::CloseFrame;

    /// Accept one client and hand its socket to `script`
    async fn serve_once<F, Fut>(script: F) -> String
    where
        F: FnOnce(WebSocketStream<TcpStream>) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            script(ws).await;
        });
        addr.to_string()
    }

    #[tokio::test]
    async fn test_data_frames_and_close() {
        let host = serve_once(|mut ws| async move {
            ws.send(Message::Binary(Vec::new())).await.unwrap();
            ws.send(Message::Ping(vec![7])).await.unwrap();
            ws.send(Message::Binary(vec![1, 2, 3])).await.unwrap();
            ws.send(Message::Text("hi".to_string())).await.unwrap();
            ws.send(Message::Close(Some(CloseFrame {
                code: CloseCode::Normal,
                reason: "done".into(),
            })))
            .await
            .unwrap();
            while let Some(Ok(_)) = ws.next().await {}
        })
        .await;

        let endpoint = Endpoint::new(host, "rm_depth_ahat", StreamRole::Pull);
        let mut session = TransportSession::open(&WebSocketConnector, endpoint)
            .await
            .unwrap();

        assert_eq!(session.receive().await.unwrap(), Bytes::from_static(&[1, 2, 3]));
        assert_eq!(session.receive().await.unwrap(), Bytes::from_static(b"hi"));
        let err = session.receive().await.unwrap_err();
        assert!(err.is_channel_closed());
        assert!(err.to_string().contains("done"));
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_send_is_one_binary_message() {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let host = serve_once(|mut ws| async move {
            let mut received = Vec::new();
            while let Some(Ok(message)) = ws.next().await {
                if let Message::Binary(data) = message {
                    received.push(data);
                }
            }
            let _ = tx.send(received);
        })
        .await;

        let endpoint = Endpoint::new(host, "microphone", StreamRole::Push);
        let mut session = TransportSession::open(&WebSocketConnector, endpoint)
            .await
            .unwrap();
        session.send(Bytes::from_static(b"abc")).await.unwrap();
        session.send(Bytes::from_static(b"de")).await.unwrap();
        session.close().await.unwrap();

        assert_eq!(rx.await.unwrap(), vec![b"abc".to_vec(), b"de".to_vec()]);
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let host = listener.local_addr().unwrap().to_string();
        drop(listener);

        let endpoint = Endpoint::new(host, "microphone", StreamRole::Push);
        let err = WebSocketConnector.connect(&endpoint).await.err().unwrap();
        assert!(matches!(err, TransportError::Connect { .. }));
    }
}
