#[rocket::launch]
fn launch() -> _ {
    let rocket = auth_server::rocket();
    log::info!("starting Chatter auth server");
    rocket
}
