//! A throwaway Neo4j server for backend tests (needs Docker).

use testcontainers::{
    core::{ContainerPort, WaitFor},
    runners::AsyncRunner,
    ContainerAsync, GenericImage, ImageExt,
};

use crate::GraphClient;

const IMAGE: (&str, &str) = ("neo4j", "5.25.1");
const BOLT_PORT: u16 = 7687;
const USER: &str = "neo4j";
const PASSWORD: &str = "testpassword";

/// Start a community Neo4j and connect to it.
///
/// Keep the returned container alive for as long as the client is used;
/// dropping it stops the server.
pub async fn neo4j_container() -> (ContainerAsync<GenericImage>, GraphClient) {
    let container = GenericImage::new(IMAGE.0, IMAGE.1)
        .with_exposed_port(ContainerPort::Tcp(BOLT_PORT))
        .with_wait_for(WaitFor::message_on_stdout("Started."))
        .with_env_var("NEO4J_AUTH", format!("{USER}/{PASSWORD}"))
        .start()
        .await
        .expect("neo4j container should start");

    let port = container
        .get_host_port_ipv4(BOLT_PORT)
        .await
        .expect("bolt port should be mapped");

    let client = GraphClient::connect(&format!("bolt://127.0.0.1:{port}"), USER, PASSWORD)
        .await
        .expect("neo4j should accept the test credentials");

    (container, client)
}
