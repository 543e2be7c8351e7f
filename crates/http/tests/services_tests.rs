//! Ticket and user services over the authenticated path

mod common;

use chamados_core::{
    NewChamado, NewUser, Priority, Role, StatusChange, TicketFilter, TicketStatus, UserUpdate,
};
use chamados_http::{
    AttachmentUpload, ChamadoService, ClientError, UserFilter, UsuarioService,
};
use common::{REFRESH_PATH, access_token, bearer, seeded_storage, session_with};
use serde_json::{Value, json};
use wiremock::matchers::{
    body_json, body_string_contains, header, header_exists, method, path, query_param,
};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn summary_json(id: i64) -> Value {
    json!({
        "id": id,
        "numero": format!("CH-2024-{id:04}"),
        "titulo": "Impressora sem toner",
        "tipo_servico_nome": "Impressoras",
        "status": "aberto",
        "prioridade": "media",
        "solicitante_nome": "Maria da Silva",
        "tecnico_responsavel": null,
        "criado_em": "2024-05-10T08:00:00Z",
        "atualizado_em": "2024-05-10T08:00:00Z"
    })
}

fn chamado_json(id: i64, status: &str) -> Value {
    json!({
        "id": id,
        "numero": format!("CH-2024-{id:04}"),
        "titulo": "Sem rede",
        "descricao": "Cabo desconectado na sala 12",
        "tipo_servico": { "id": 2, "nome": "Rede", "ativo": true },
        "status": status,
        "prioridade": "urgente",
        "localizacao": "Sala 12",
        "solicitante": { "id": 7, "nome_completo": "Maria da Silva", "iniciais": "MS" },
        "tecnico_responsavel": null,
        "anexos": [],
        "historico": [],
        "criado_em": "2024-05-10T08:00:00Z",
        "atualizado_em": "2024-05-10T08:00:00Z"
    })
}

fn attachment_json(id: i64, name: &str) -> Value {
    json!({
        "id": id,
        "arquivo": format!("/media/anexos/{name}"),
        "nome_original": name,
        "tamanho": 3,
        "tamanho_formatado": "3 bytes",
        "tipo_arquivo": "text/plain",
        "criado_em": "2024-05-10T08:01:00Z"
    })
}

fn new_ticket() -> NewChamado {
    NewChamado {
        title: "Sem rede".into(),
        description: "Cabo desconectado na sala 12".into(),
        service_type: 2,
        priority: Some(Priority::Urgent),
        equipment: None,
        location: Some("Sala 12".into()),
    }
}

#[tokio::test]
async fn test_list_sends_filters_and_reads_pages() {
    let server = MockServer::start().await;
    let token = access_token(300, "ok");

    Mock::given(method("GET"))
        .and(path("/chamados/"))
        .and(query_param("status", "aberto"))
        .and(query_param("prioridade", "alta"))
        .and(header("authorization", bearer(&token).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 21,
            "next": format!("{}/chamados/?page=2", server.uri()),
            "previous": null,
            "results": [summary_json(1), summary_json(2)]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let service = ChamadoService::new(session_with(
        &server,
        seeded_storage(Some(&token), Some("refresh-1")),
    ));
    let filter = TicketFilter {
        status: Some(TicketStatus::Open),
        priority: Some(Priority::High),
        ..TicketFilter::default()
    };

    let page = service.list(&filter).await.unwrap();
    assert_eq!(page.count, 21);
    assert_eq!(page.results.len(), 2);
    assert!(page.has_more());
}

#[tokio::test]
async fn test_my_tickets_accepts_plain_arrays() {
    let server = MockServer::start().await;
    let token = access_token(300, "ok");

    Mock::given(method("GET"))
        .and(path("/chamados/meus-chamados/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([summary_json(4), summary_json(5)])),
        )
        .mount(&server)
        .await;

    let service = ChamadoService::new(session_with(
        &server,
        seeded_storage(Some(&token), Some("refresh-1")),
    ));

    let page = service.my_tickets(&TicketFilter::default()).await.unwrap();
    assert_eq!(page.count, 2);
    assert_eq!(page.results[0].number, "CH-2024-0004");
    assert!(!page.has_more());
}

#[tokio::test]
async fn test_status_change_is_patched() {
    let server = MockServer::start().await;
    let token = access_token(300, "ok");

    Mock::given(method("PATCH"))
        .and(path("/chamados/3/status/"))
        .and(body_json(json!({ "status": "encerrado" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(chamado_json(3, "encerrado")))
        .expect(1)
        .mount(&server)
        .await;

    let service = ChamadoService::new(session_with(
        &server,
        seeded_storage(Some(&token), Some("refresh-1")),
    ));

    let updated = service
        .update_status(
            3,
            &StatusChange {
                status: TicketStatus::Closed,
                technician_notes: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.status, TicketStatus::Closed);
}

#[tokio::test]
async fn test_forbidden_status_change_surfaces_as_error() {
    let server = MockServer::start().await;
    let token = access_token(300, "ok");

    Mock::given(method("PATCH"))
        .and(path("/chamados/3/status/"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": "Apenas técnicos podem alterar para este status"
        })))
        .mount(&server)
        .await;

    let service = ChamadoService::new(session_with(
        &server,
        seeded_storage(Some(&token), Some("refresh-1")),
    ));

    let err = service
        .update_status(
            3,
            &StatusChange {
                status: TicketStatus::InProgress,
                technician_notes: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Forbidden(_)));
}

#[tokio::test]
async fn test_failed_attachment_does_not_abort_creation() {
    let server = MockServer::start().await;
    let token = access_token(300, "ok");

    Mock::given(method("POST"))
        .and(path("/chamados/"))
        .respond_with(ResponseTemplate::new(201).set_body_json(chamado_json(5, "aberto")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chamados/5/anexos/"))
        .and(body_string_contains("filename=\"grande.pdf\""))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "Arquivo muito grande"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chamados/5/anexos/"))
        .and(header_exists("content-type"))
        .respond_with(ResponseTemplate::new(201).set_body_json(attachment_json(11, "log.txt")))
        .mount(&server)
        .await;

    let service = ChamadoService::new(session_with(
        &server,
        seeded_storage(Some(&token), Some("refresh-1")),
    ));
    let uploads = [
        AttachmentUpload::new("grande.pdf", vec![0; 16]),
        AttachmentUpload::new("log.txt", b"abc".to_vec()),
    ];

    let creation = service
        .create_with_attachments(&new_ticket(), &uploads)
        .await
        .unwrap();

    assert_eq!(creation.chamado.id, 5);
    assert!(!creation.is_complete());
    assert_eq!(creation.attachments.len(), 1);
    assert_eq!(creation.attachments[0].original_name, "log.txt");
    assert_eq!(creation.failures.len(), 1);
    match &creation.failures[0] {
        ClientError::AttachmentUpload { file_name, source } => {
            assert_eq!(file_name, "grande.pdf");
            assert!(matches!(**source, ClientError::BadRequest(_)));
        }
        other => panic!("unexpected failure: {other}"),
    }
}

#[tokio::test]
async fn test_multipart_upload_is_rebuilt_for_replay() {
    let server = MockServer::start().await;
    let old = access_token(-5, "old");
    let new = access_token(300, "new");

    Mock::given(method("POST"))
        .and(path("/chamados/5/anexos/"))
        .and(header("authorization", bearer(&old).as_str()))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chamados/5/anexos/"))
        .and(header("authorization", bearer(&new).as_str()))
        .and(body_string_contains("name=\"arquivo\""))
        .respond_with(ResponseTemplate::new(201).set_body_json(attachment_json(12, "foto.png")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access": new })))
        .expect(1)
        .mount(&server)
        .await;

    let service = ChamadoService::new(session_with(
        &server,
        seeded_storage(Some(&old), Some("refresh-1")),
    ));

    let attachment = service
        .upload_attachment(5, &AttachmentUpload::new("foto.png", vec![1, 2, 3]))
        .await
        .unwrap();
    assert_eq!(attachment.id, 12);
}

#[tokio::test]
async fn test_statistics_and_service_types() {
    let server = MockServer::start().await;
    let token = access_token(300, "ok");

    Mock::given(method("GET"))
        .and(path("/chamados/estatisticas/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_chamados": 10,
            "chamados_abertos": 4,
            "chamados_em_atendimento": 3,
            "chamados_encerrados": 3,
            "chamados_urgentes": 1,
            "meus_chamados": 2,
            "meus_chamados_pendentes": 1
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/chamados/tipos-servico/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 1, "nome": "Hardware", "ativo": true },
            { "id": 2, "nome": "Rede", "ativo": true }
        ])))
        .mount(&server)
        .await;

    let service = ChamadoService::new(session_with(
        &server,
        seeded_storage(Some(&token), Some("refresh-1")),
    ));

    let stats = service.statistics().await.unwrap();
    assert_eq!(stats.total, 10);
    assert_eq!(stats.mine_pending, 1);

    let types = service.service_types().await.unwrap();
    assert_eq!(types.len(), 2);
    assert_eq!(types[1].name, "Rede");
}

#[tokio::test]
async fn test_delete_ticket_and_attachment() {
    let server = MockServer::start().await;
    let token = access_token(300, "ok");

    Mock::given(method("DELETE"))
        .and(path("/chamados/8/"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/chamados/anexos/11/"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let service = ChamadoService::new(session_with(
        &server,
        seeded_storage(Some(&token), Some("refresh-1")),
    ));

    service.delete(8).await.unwrap();
    service.delete_attachment(11).await.unwrap();
}

#[tokio::test]
async fn test_user_directory() {
    let server = MockServer::start().await;
    let token = access_token(300, "ok");

    Mock::given(method("GET"))
        .and(path("/usuarios/"))
        .and(query_param("tipo_usuario", "tecnico"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 1,
            "next": null,
            "previous": null,
            "results": [common::profile_json()]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/usuarios/tecnicos/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 3, "username": "joao", "nome_completo": "Joao Souza", "iniciais": "JS" }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/usuarios/7/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::profile_json()))
        .mount(&server)
        .await;

    let service = UsuarioService::new(session_with(
        &server,
        seeded_storage(Some(&token), Some("refresh-1")),
    ));

    let filter = UserFilter {
        role: Some(Role::Technician),
        ..UserFilter::default()
    };
    assert_eq!(service.list(&filter).await.unwrap().count, 1);
    assert_eq!(service.technicians().await.unwrap()[0].display_name, "Joao Souza");
    assert_eq!(service.get(7).await.unwrap().username, "maria");
}

#[tokio::test]
async fn test_user_accounts_are_created_updated_and_deleted() {
    let server = MockServer::start().await;
    let token = access_token(300, "ok");

    Mock::given(method("POST"))
        .and(path("/usuarios/"))
        .and(body_json(json!({
            "username": "joao",
            "email": "joao@example.com",
            "password": "s3nha-forte",
            "password_confirm": "s3nha-forte",
            "nome_completo": "Joao Souza",
            "tipo_usuario": "tecnico"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "username": "joao",
            "email": "joao@example.com",
            "nome_completo": "Joao Souza",
            "tipo_usuario": "tecnico",
            "departamento": null,
            "telefone": null
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/usuarios/7/"))
        .and(header("authorization", bearer(&token).as_str()))
        .and(body_json(json!({ "ativo": false })))
        .respond_with(ResponseTemplate::new(200).set_body_json({
            let mut profile = common::profile_json();
            profile["ativo"] = json!(false);
            profile
        }))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/usuarios/7/"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let service = UsuarioService::new(session_with(
        &server,
        seeded_storage(Some(&token), Some("refresh-1")),
    ));

    let new_user = NewUser {
        email: "joao@example.com".into(),
        ..NewUser::new("joao", "Joao Souza", "s3nha-forte", Role::Technician)
    };
    let created = service.create(&new_user).await.unwrap();
    assert_eq!(created.role, Role::Technician);
    assert_eq!(created.display_name, "Joao Souza");

    let update = UserUpdate {
        active: Some(false),
        ..UserUpdate::default()
    };
    assert!(!service.update(7, &update).await.unwrap().active);

    service.delete(7).await.unwrap();
}

#[tokio::test]
async fn test_invalid_new_user_is_rejected_locally() {
    let server = MockServer::start().await;
    let service = UsuarioService::new(session_with(
        &server,
        seeded_storage(Some(&access_token(300, "ok")), Some("refresh-1")),
    ));

    let mut new_user = NewUser::new("joao", "Joao Souza", "s3nha-forte", Role::Requester);
    new_user.password_confirm = "outra-senha".into();

    let err = service.create(&new_user).await.unwrap_err();
    assert!(matches!(err, ClientError::BadRequest(msg) if msg.contains("match")));
    assert!(server.received_requests().await.unwrap().is_empty());
}
